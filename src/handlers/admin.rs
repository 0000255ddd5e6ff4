use axum::{Form, Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::allowlist::parse_ip;
use crate::error::AdminError;
use crate::models::{AllowedEntry, AllowedIp, Attempt};
use crate::state::AppState;

const SECS_PER_HOUR: u64 = 3600;

#[derive(Deserialize, Default)]
pub struct AllowForm {
    pub ip: Option<String>,
    pub duration: Option<String>, // whole hours
}

#[derive(Deserialize, Default)]
pub struct DenyForm {
    pub ip: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_hours(raw: &str) -> Result<Duration, AdminError> {
    match raw.parse::<u64>() {
        Ok(hours) if hours > 0 => Ok(Duration::from_secs(hours.saturating_mul(SECS_PER_HOUR))),
        _ => Err(AdminError::InvalidDuration),
    }
}

pub async fn allow_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AllowForm>,
) -> Result<Json<AllowedIp>, AdminError> {
    let ip = required(form.ip).ok_or(AdminError::MissingIp)?;
    parse_ip(&ip)?;
    let duration = required(form.duration).ok_or(AdminError::MissingDuration)?;
    let duration = parse_hours(&duration)?;

    let entry = state.store.grant(&ip, duration).await?;
    Ok(Json(entry))
}

pub async fn deny_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DenyForm>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let ip = required(form.ip).ok_or(AdminError::MissingIp)?;
    let parsed = parse_ip(&ip)?;

    state.store.revoke(&ip).await?;
    Ok(Json(serde_json::json!({ "ip": parsed, "revoked": true })))
}

// Allowed IPs, with location taken from each IP's latest attempt
pub async fn allowed_handler(State(state): State<Arc<AppState>>) -> Json<Vec<AllowedEntry>> {
    let allowed = state.store.list_allowed().await;
    let latest = state.ledger.latest().await;

    let entries = allowed
        .into_iter()
        .map(|entry| AllowedEntry {
            info: latest.get(&entry.ip).and_then(|a| a.info.clone()),
            ip: entry.ip,
            expires_at: entry.expires_at,
        })
        .collect();
    Json(entries)
}

pub async fn pending_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Attempt>> {
    Json(state.ledger.pending().await)
}

pub async fn attempts_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Attempt>> {
    Json(state.ledger.recent().await)
}
