//! Shared fixtures: a recording mock upstream and state builders.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use prism::forward::Forwarder;
use prism::geo::GeoClient;
use prism::state::AppState;

/// What the mock upstream has been sent so far.
#[derive(Default)]
pub struct Seen {
    hits: AtomicUsize,
    pub uris: Mutex<Vec<String>>,
    pub headers: Mutex<Vec<HeaderMap>>,
    pub bodies: Mutex<Vec<Bytes>>,
    slow_dropped: AtomicBool,
}

impl Seen {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn uri(&self, n: usize) -> String {
        self.uris.lock().unwrap()[n].clone()
    }

    pub fn header_map(&self, n: usize) -> HeaderMap {
        self.headers.lock().unwrap()[n].clone()
    }

    pub fn body(&self, n: usize) -> Bytes {
        self.bodies.lock().unwrap()[n].clone()
    }

    /// Whether a `/slow` handler was dropped before it could answer.
    pub fn slow_abandoned(&self) -> bool {
        self.slow_dropped.load(Ordering::SeqCst)
    }
}

// Flags the handler future as dropped unless it ran to completion.
struct AbandonGuard {
    seen: Arc<Seen>,
    finished: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.seen.slow_dropped.store(true, Ordering::SeqCst);
        }
    }
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub seen: Arc<Seen>,
}

impl MockUpstream {
    /// Start the mock upstream on an ephemeral loopback port.
    pub async fn start() -> Self {
        let seen = Arc::new(Seen::default());
        let app = Router::new()
            .route("/hello", get(hello))
            .route("/echo", post(echo))
            .route("/redirect", get(redirect))
            .route("/chunked", get(chunked))
            .route("/slow", get(slow))
            .fallback(anything)
            .with_state(seen.clone());

        let addr = serve(app).await;
        Self { addr, seen }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn state_for(target: &str) -> Arc<AppState> {
    state_with_timeout(target, Duration::from_secs(5))
}

pub fn state_with_timeout(target: &str, timeout: Duration) -> Arc<AppState> {
    let forwarder = Forwarder::new(target, timeout).unwrap();
    Arc::new(AppState::new(GeoClient::disabled(), forwarder))
}

pub fn state_with_geo(target: &str, geo_url: &str) -> Arc<AppState> {
    let forwarder = Forwarder::new(target, Duration::from_secs(5)).unwrap();
    let geo = GeoClient::new(geo_url, Duration::from_secs(5)).unwrap();
    Arc::new(AppState::new(geo, forwarder))
}

/// Geo service whose first answer takes `first_delay`; later ones are immediate.
pub async fn geo_service(first_delay: Duration) -> String {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route(
        "/{ip}/json",
        get(move || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(first_delay).await;
                }
                Json(serde_json::json!({ "city": "Porto", "country": "PT" }))
            }
        }),
    );
    format!("http://{}/", serve(app).await)
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub async fn body_bytes(resp: Response) -> Bytes {
    axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap()
}

fn remember(seen: &Seen, req: &Request) {
    seen.hits.fetch_add(1, Ordering::SeqCst);
    seen.uris.lock().unwrap().push(req.uri().to_string());
    seen.headers.lock().unwrap().push(req.headers().clone());
}

async fn hello(State(seen): State<Arc<Seen>>, req: Request) -> Response {
    remember(&seen, &req);
    (StatusCode::CREATED, [("x-test", "v")], "hello").into_response()
}

async fn echo(State(seen): State<Arc<Seen>>, req: Request) -> Response {
    remember(&seen, &req);
    let content_type = req.headers().get(header::CONTENT_TYPE).cloned();
    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    seen.bodies.lock().unwrap().push(body.clone());

    let mut resp = Response::new(Body::from(body));
    if let Some(ct) = content_type {
        resp.headers_mut().insert(header::CONTENT_TYPE, ct);
    }
    resp
}

async fn redirect(State(seen): State<Arc<Seen>>, req: Request) -> Response {
    remember(&seen, &req);
    (StatusCode::FOUND, [(header::LOCATION, "/elsewhere")]).into_response()
}

async fn chunked(State(seen): State<Arc<Seen>>, req: Request) -> Response {
    remember(&seen, &req);
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"part-1;")),
        Ok(Bytes::from_static(b"part-2;")),
        Ok(Bytes::from_static(&[0, 159, 146, 150, 255])),
    ];
    Response::new(Body::from_stream(futures::stream::iter(chunks)))
}

async fn slow(State(seen): State<Arc<Seen>>, req: Request) -> Response {
    remember(&seen, &req);
    let mut guard = AbandonGuard { seen, finished: false };
    tokio::time::sleep(Duration::from_secs(10)).await;
    guard.finished = true;
    "late".into_response()
}

async fn anything(State(seen): State<Arc<Seen>>, req: Request) -> Response {
    let method = req.method().to_string();
    remember(&seen, &req);
    Json(serde_json::json!({ "method": method })).into_response()
}
