use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::ledger::AttemptLedger;
use crate::metrics::ALLOWED_IPS;
use crate::models::AllowedIp;

pub fn parse_ip(ip: &str) -> Result<IpAddr, StoreError> {
    ip.trim()
        .parse()
        .map_err(|_| StoreError::InvalidIp(ip.to_string()))
}

/// Time-boxed table of admitted IPs.
///
/// Expired entries are never returned but stay in the table until they are
/// overwritten, revoked or removed by [`AllowlistStore::sweep_expired`].
pub struct AllowlistStore {
    entries: RwLock<HashMap<IpAddr, AllowedIp>>,
    ledger: Arc<AttemptLedger>,
}

impl AllowlistStore {
    pub fn new(ledger: Arc<AttemptLedger>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ledger,
        }
    }

    pub async fn grant(&self, ip: &str, duration: Duration) -> Result<AllowedIp, StoreError> {
        self.grant_at(ip, duration, Utc::now()).await
    }

    pub async fn grant_at(
        &self,
        ip: &str,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<AllowedIp, StoreError> {
        let ip = parse_ip(ip)?;
        let ttl = TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX);
        let entry = AllowedIp {
            ip,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        {
            let mut entries = self.entries.write().await;
            entries.insert(ip, entry.clone());
            ALLOWED_IPS.set(entries.len() as f64);
        }
        self.ledger.mark_allowed(ip).await;

        info!(%ip, expires_at = %entry.expires_at, "IP allowed");
        Ok(entry)
    }

    pub async fn revoke(&self, ip: &str) -> Result<(), StoreError> {
        let ip = parse_ip(ip)?;

        {
            let mut entries = self.entries.write().await;
            entries.remove(&ip);
            ALLOWED_IPS.set(entries.len() as f64);
        }

        info!(%ip, "IP revoked");
        Ok(())
    }

    pub async fn is_allowed(&self, ip: &str) -> bool {
        self.is_allowed_at(ip, Utc::now()).await
    }

    pub async fn is_allowed_at(&self, ip: &str, now: DateTime<Utc>) -> bool {
        match parse_ip(ip) {
            Ok(ip) => self.allows_at(ip, now).await,
            Err(_) => false,
        }
    }

    pub async fn allows(&self, ip: IpAddr) -> bool {
        self.allows_at(ip, Utc::now()).await
    }

    pub async fn allows_at(&self, ip: IpAddr, now: DateTime<Utc>) -> bool {
        self.entries
            .read()
            .await
            .get(&ip)
            .is_some_and(|entry| entry.is_live_at(now))
    }

    pub async fn list_allowed(&self) -> Vec<AllowedIp> {
        self.list_allowed_at(Utc::now()).await
    }

    pub async fn list_allowed_at(&self, now: DateTime<Utc>) -> Vec<AllowedIp> {
        let mut allowed: Vec<AllowedIp> = self
            .entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live_at(now))
            .cloned()
            .collect();
        allowed.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        allowed
    }

    /// Drops entries that expired at or before `now`; returns how many went.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live_at(now));
        ALLOWED_IPS.set(entries.len() as f64);
        before - entries.len()
    }

    // physical size, stale entries included
    pub async fn stored(&self) -> usize {
        self.entries.read().await.len()
    }
}

// Periodically clears expired grants out of the table
pub async fn sweeper(store: Arc<AllowlistStore>, every: Duration) {
    let mut interval = interval(every);

    info!(interval = ?every, "Allowlist sweeper started");

    loop {
        interval.tick().await;

        let removed = store.sweep_expired(Utc::now()).await;
        if removed > 0 {
            debug!(removed, "swept expired grants");
        }
    }
}
