//! IP-admission gated reverse proxy.
//!
//! Requests whose client IP holds a live grant are forwarded verbatim to a
//! single upstream; everything else gets a 403 and lands in the attempt
//! ledger, where an operator can review it and grant access through the
//! admin listener.

pub mod allowlist;
pub mod config;
pub mod error;
pub mod forward;
pub mod geo;
pub mod handlers;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod state;
