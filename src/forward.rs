use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::http::header::HOST;
use axum::response::Response;
use reqwest::Url;
use reqwest::redirect::Policy;
use std::time::{Duration, Instant};

use crate::error::ForwardError;
use crate::metrics::UPSTREAM_LATENCY;

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

// Accepts only absolute http(s) URLs that can carry a path
pub fn parse_upstream(raw: &str) -> Result<Url, ForwardError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ForwardError::UpstreamConfig(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() || url.host().is_none()
    {
        return Err(ForwardError::UpstreamConfig(raw.to_string()));
    }
    Ok(url)
}

/// Replays admitted requests against a single upstream.
///
/// Bodies are streamed both ways. Redirects are returned to the caller, never
/// followed, and nothing is retried. Dropping the returned future or the
/// response body (the client went away) aborts the upstream exchange.
pub struct Forwarder {
    client: reqwest::Client,
    raw: String,
    base: Option<Url>,
}

impl Forwarder {
    pub fn new(target: &str, timeout: Duration) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            raw: target.to_string(),
            base: parse_upstream(target).ok(),
        })
    }

    pub fn target_url(&self, path: &str, query: Option<&str>) -> Result<Url, ForwardError> {
        let mut url = self
            .base
            .clone()
            .ok_or_else(|| ForwardError::UpstreamConfig(self.raw.clone()))?;
        url.set_path(path);
        url.set_query(query);
        Ok(url)
    }

    pub async fn forward(&self, req: Request) -> Result<Response, ForwardError> {
        let (parts, body) = req.into_parts();
        let url = self.target_url(parts.uri.path(), parts.uri.query())?;

        let mut headers = parts.headers;
        // the upstream authority comes from the target URL
        headers.remove(HOST);

        let mut outbound = self.client.request(parts.method, url).headers(headers);
        if body.size_hint().exact() != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let started = Instant::now();
        let upstream = outbound.send().await?;
        UPSTREAM_LATENCY.observe(started.elapsed().as_secs_f64());

        let status = upstream.status();
        let headers = upstream.headers().clone();

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
