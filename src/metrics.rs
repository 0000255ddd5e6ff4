use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram,
};

lazy_static! {
    pub static ref REQUESTS_TOTAL: Counter =
        register_counter!("prism_requests_total", "Total number of proxied requests").unwrap();
    pub static ref DENIED_TOTAL: Counter =
        register_counter!("prism_denied_total", "Requests denied at admission").unwrap();
    pub static ref FORWARD_ERRORS_TOTAL: Counter = register_counter!(
        "prism_forward_errors_total",
        "Admitted requests that failed to reach the upstream"
    )
    .unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "prism_upstream_latency_seconds",
        "Time until upstream response headers, in seconds"
    )
    .unwrap();
    pub static ref ALLOWED_IPS: Gauge =
        register_gauge!("prism_allowed_ips", "Entries currently held in the allowlist").unwrap();
    pub static ref GEO_LOOKUPS: Counter =
        register_counter!("prism_geo_lookups_total", "Enrichment requests sent").unwrap();
    pub static ref GEO_CACHE_HITS: Counter =
        register_counter!("prism_geo_cache_hits_total", "Enrichment cache hits").unwrap();
}
