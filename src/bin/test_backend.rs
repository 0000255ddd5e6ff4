//! Throwaway upstream for trying the proxy end to end.

use axum::{
    Json, Router,
    extract::ConnectInfo,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "test_backend")]
#[command(about = "Minimal upstream that reports what reached it")]
struct Args {
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    ["x-forwarded-for", "x-real-ip"]
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

async fn home_handler(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    method: axum::http::Method,
    uri: axum::http::Uri,
) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><title>Test Backend</title></head><body>\
         <h1>Success!</h1><p>Your request reached the backend through the proxy.</p>\
         <ul><li>Client IP: <code>{}</code></li><li>Time: <code>{}</code></li>\
         <li>Path: <code>{}</code></li><li>Method: <code>{}</code></li></ul>\
         <p><code>GET /api/status</code>, <code>POST /api/echo</code>, \
         <code>GET /redirect</code></p></body></html>",
        client_ip(&headers, peer),
        chrono::Utc::now().to_rfc3339(),
        uri.path(),
        method,
    ))
}

async fn status_handler(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "client_ip": client_ip(&headers, peer),
        "backend": "test-backend",
    }))
}

async fn echo_handler(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let Ok(body) = serde_json::from_slice::<serde_json::Value>(&body) else {
        return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
    };
    Json(serde_json::json!({
        "echo": body,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "client_ip": client_ip(&headers, peer),
    }))
    .into_response()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let app = Router::new()
        .route("/", get(home_handler))
        .route("/api/status", get(status_handler))
        .route("/api/echo", post(echo_handler))
        .route(
            "/redirect",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/")]) }),
        );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!(port = args.port, "Test backend listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
