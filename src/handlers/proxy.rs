use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::metrics::{DENIED_TOTAL, FORWARD_ERRORS_TOTAL, REQUESTS_TOTAL};
use crate::state::AppState;

// Highest precedence first. These are only trustworthy when an edge in front
// of the proxy sets them.
const CDN_CLIENT_IP: &str = "cf-connecting-ip";
const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?;
    let value = match value.to_str() {
        Ok(v) => v.to_string(),
        // present but unreadable: surfaces as an invalid address
        Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
    };
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Resolves the client address the admission decision is keyed on.
///
/// The first non-empty of the CDN client-IP header, X-Forwarded-For (its
/// first hop) and X-Real-IP wins; otherwise the socket peer. `None` when
/// none of them is available.
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(ip) = header_value(headers, CDN_CLIENT_IP) {
        return Some(ip);
    }
    if let Some(chain) = header_value(headers, FORWARDED_FOR) {
        let first = chain.split(',').next().unwrap_or_default().trim();
        return Some(first.to_string());
    }
    if let Some(ip) = header_value(headers, REAL_IP) {
        return Some(ip);
    }
    peer.map(|addr| addr.ip().to_string())
}

fn access_denied() -> Response {
    DENIED_TOTAL.inc();
    (StatusCode::FORBIDDEN, "Access denied").into_response()
}

pub async fn proxy_handler(State(state): State<Arc<AppState>>, req: Request) -> Response {
    REQUESTS_TOTAL.inc();

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = extract_client_ip(req.headers(), peer).unwrap_or_default();

    // No usable address means no storage key: deny before touching the store.
    let Ok(ip) = client_ip.parse::<IpAddr>() else {
        warn!(client_ip = %client_ip, method = %req.method(), path = req.uri().path(), "Denied: invalid IP");
        return access_denied();
    };

    if !state.store.allows(ip).await {
        state.ledger.record(ip, false).await;
        warn!(%ip, method = %req.method(), path = req.uri().path(), "Denied");
        return access_denied();
    }

    // Booked now so the ledger follows decision order; location may land later.
    let admitted = state.ledger.record_decision(ip, true).await;
    if admitted.info.is_none() {
        let ledger = state.ledger.clone();
        tokio::spawn(async move {
            ledger.enrich(admitted).await;
        });
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    match state.forwarder.forward(req).await {
        Ok(response) => {
            debug!(%ip, %method, %path, status = %response.status(), "Forwarded");
            response
        }
        Err(e) => {
            FORWARD_ERRORS_TOTAL.inc();
            warn!(%ip, %method, %path, error = %e, "Forwarding error");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.200:51234".parse().unwrap())
    }

    #[test]
    fn cdn_header_wins_over_forwarded_for() {
        let h = headers(&[(CDN_CLIENT_IP, "9.9.9.9"), (FORWARDED_FOR, "1.1.1.1")]);
        assert_eq!(extract_client_ip(&h, peer()).as_deref(), Some("9.9.9.9"));
    }

    #[test]
    fn forwarded_for_wins_over_real_ip() {
        let h = headers(&[(FORWARDED_FOR, "1.1.1.1, 10.0.0.1"), (REAL_IP, "2.2.2.2")]);
        assert_eq!(extract_client_ip(&h, peer()).as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn real_ip_then_peer() {
        let h = headers(&[(REAL_IP, " 2.2.2.2 ")]);
        assert_eq!(extract_client_ip(&h, peer()).as_deref(), Some("2.2.2.2"));
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), peer()).as_deref(),
            Some("192.0.2.200")
        );
    }

    #[test]
    fn empty_headers_are_skipped() {
        let h = headers(&[(CDN_CLIENT_IP, ""), (FORWARDED_FOR, "  ")]);
        assert_eq!(extract_client_ip(&h, peer()).as_deref(), Some("192.0.2.200"));
    }

    #[test]
    fn ipv6_peer_is_unbracketed() {
        let peer: SocketAddr = "[2001:db8::7]:443".parse().unwrap();
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), Some(peer)).as_deref(),
            Some("2001:db8::7")
        );
    }

    #[test]
    fn nothing_to_go_on() {
        assert_eq!(extract_client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn garbage_header_is_not_skipped() {
        let h = headers(&[(CDN_CLIENT_IP, "not-an-ip")]);
        let ip = extract_client_ip(&h, peer()).unwrap();
        assert_eq!(ip, "not-an-ip");
        assert!(ip.parse::<IpAddr>().is_err());
    }
}
