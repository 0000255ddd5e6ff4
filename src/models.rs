use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

// A granted IP and the moment its grant stops counting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedIp {
    pub ip: IpAddr,
    pub expires_at: DateTime<Utc>,
}

impl AllowedIp {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// Location metadata as returned by the enrichment service
// (missing fields decode as empty strings)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoInfo {
    pub city: String,
    pub region: String,
    pub country: String,
    pub org: String,
}

// One recorded admission decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub ip: IpAddr,
    pub timestamp: DateTime<Utc>,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<GeoInfo>,
    pub attempt_number: u64, // 1-based, counts every attempt from this IP
}

// Allowed entry joined with whatever we know about its location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedEntry {
    pub ip: IpAddr,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<GeoInfo>,
}
