use dashmap::DashMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

use crate::metrics::{GEO_CACHE_HITS, GEO_LOOKUPS};
use crate::models::GeoInfo;

pub const DEFAULT_GEO_URL: &str = "https://ipinfo.io/";
pub const DEFAULT_GEO_TIMEOUT: Duration = Duration::from_secs(5);

// Best-effort IP -> location lookups.
//
// Successful answers are kept forever; failures are not cached so a later
// call goes back to the network.
pub struct GeoClient {
    client: reqwest::Client,
    base_url: Option<String>, // None = enrichment disabled
    cache: DashMap<IpAddr, GeoInfo>,
}

impl GeoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url: Some(base_url),
            cache: DashMap::new(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
            cache: DashMap::new(),
        }
    }

    pub async fn lookup(&self, ip: IpAddr) -> Option<GeoInfo> {
        let base_url = self.base_url.as_deref()?;

        if let Some(hit) = self.cache.get(&ip) {
            GEO_CACHE_HITS.inc();
            return Some(hit.clone());
        }

        // The map guard is released above; never hold it across the request.
        let info = self.fetch(base_url, ip).await?;
        self.cache.insert(ip, info.clone());
        Some(info)
    }

    async fn fetch(&self, base_url: &str, ip: IpAddr) -> Option<GeoInfo> {
        GEO_LOOKUPS.inc();
        let url = format!("{base_url}{ip}/json");

        let res = match self.client.get(&url).send().await {
            Ok(res) => res,
            Err(e) => {
                debug!(%ip, error = %e, "geo lookup failed");
                return None;
            }
        };

        if res.status() != reqwest::StatusCode::OK {
            debug!(%ip, status = %res.status(), "geo lookup rejected");
            return None;
        }

        match res.json::<GeoInfo>().await {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(%ip, error = %e, "geo lookup returned undecodable body");
                None
            }
        }
    }

    // memo only, never touches the network
    pub fn cached_info(&self, ip: IpAddr) -> Option<GeoInfo> {
        self.base_url.as_ref()?;
        self.cache.get(&ip).map(|hit| hit.clone())
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
