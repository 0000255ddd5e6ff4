use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::geo::GeoClient;
use crate::models::Attempt;

pub const RECENT_CAPACITY: usize = 30;

#[derive(Default)]
struct LedgerState {
    latest: HashMap<IpAddr, Attempt>,
    recent: VecDeque<Attempt>, // oldest at the front
}

/// Record of admission decisions.
///
/// Keeps the latest attempt per IP plus a bounded, insertion-ordered
/// history across all IPs. The two are maintained independently: the
/// history may still hold older attempts of an IP whose latest entry
/// has since moved on.
pub struct AttemptLedger {
    geo: Arc<GeoClient>,
    capacity: usize,
    state: RwLock<LedgerState>,
}

impl AttemptLedger {
    pub fn new(geo: Arc<GeoClient>) -> Self {
        Self::with_capacity(geo, RECENT_CAPACITY)
    }

    pub fn with_capacity(geo: Arc<GeoClient>, capacity: usize) -> Self {
        Self {
            geo,
            capacity,
            state: RwLock::new(LedgerState {
                latest: HashMap::new(),
                recent: VecDeque::with_capacity(capacity + 1),
            }),
        }
    }

    /// Records one admission outcome and returns the stored, enriched attempt.
    pub async fn record(&self, ip: IpAddr, allowed: bool) -> Attempt {
        let attempt = self.record_decision(ip, allowed).await;
        self.enrich(attempt).await
    }

    /// Books the outcome at the moment it was decided.
    ///
    /// Only memoized enrichment is attached here, so the numbering and the
    /// history order follow decision order whatever the lookup latency.
    pub async fn record_decision(&self, ip: IpAddr, allowed: bool) -> Attempt {
        let info = self.geo.cached_info(ip);

        let mut state = self.state.write().await;
        let attempt_number = state
            .latest
            .get(&ip)
            .map_or(1, |prev| prev.attempt_number + 1);

        let attempt = Attempt {
            ip,
            timestamp: Utc::now(),
            allowed,
            info,
            attempt_number,
        };

        state.latest.insert(ip, attempt.clone());
        state.recent.push_back(attempt.clone());
        while state.recent.len() > self.capacity {
            state.recent.pop_front();
        }

        attempt
    }

    /// Looks up location for a booked attempt and fills it in place.
    ///
    /// The lookup runs without the lock. The answer only lands on the entries
    /// carrying this attempt's number, so a newer attempt is never overwritten.
    pub async fn enrich(&self, mut attempt: Attempt) -> Attempt {
        if attempt.info.is_some() {
            return attempt;
        }
        let Some(info) = self.geo.lookup(attempt.ip).await else {
            return attempt;
        };

        let (ip, number) = (attempt.ip, attempt.attempt_number);
        let mut state = self.state.write().await;
        if let Some(latest) = state.latest.get_mut(&ip)
            && latest.attempt_number == number
        {
            latest.info = Some(info.clone());
        }
        if let Some(entry) = state
            .recent
            .iter_mut()
            .rev()
            .find(|a| a.ip == ip && a.attempt_number == number)
        {
            entry.info = Some(info.clone());
        }
        drop(state);

        attempt.info = Some(info);
        attempt
    }

    /// Flags the latest attempt of `ip` as allowed after a grant.
    /// Leaves the attempt counter alone.
    pub async fn mark_allowed(&self, ip: IpAddr) {
        let mut state = self.state.write().await;
        if let Some(attempt) = state.latest.get_mut(&ip) {
            attempt.allowed = true;
            attempt.timestamp = Utc::now();
        }
    }

    pub async fn latest(&self) -> HashMap<IpAddr, Attempt> {
        self.state.read().await.latest.clone()
    }

    pub async fn latest_for(&self, ip: IpAddr) -> Option<Attempt> {
        self.state.read().await.latest.get(&ip).cloned()
    }

    pub async fn recent(&self) -> Vec<Attempt> {
        self.state.read().await.recent.iter().cloned().collect()
    }

    /// Latest attempts that are still denied, newest first.
    pub async fn pending(&self) -> Vec<Attempt> {
        let mut pending: Vec<Attempt> = self
            .state
            .read()
            .await
            .latest
            .values()
            .filter(|attempt| !attempt.allowed)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        pending
    }
}
