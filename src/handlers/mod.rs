mod admin;
mod health;
mod metrics;
mod proxy;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

pub use admin::{allow_handler, allowed_handler, attempts_handler, deny_handler, pending_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use proxy::{extract_client_ip, proxy_handler};

// Every method and path goes through the admission gate
pub fn proxy_router(state: Arc<AppState>) -> Router {
    Router::new().fallback(proxy_handler).with_state(state)
}

pub fn admin_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/allowed", get(allowed_handler))
        .route("/pending", get(pending_handler))
        .route("/attempts", get(attempts_handler))
        .route("/allow", post(allow_handler))
        .route("/deny", post(deny_handler))
        .with_state(state)
}
