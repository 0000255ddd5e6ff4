use clap::Parser;
use std::time::Duration;

use crate::forward::DEFAULT_UPSTREAM_TIMEOUT;
use crate::geo::DEFAULT_GEO_TIMEOUT;

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "prism")]
#[command(about = "IP-admission gated reverse proxy")]
pub struct Args {
    // Upstream every admitted request is forwarded to
    // Example: "http://localhost:3000"
    #[arg(long, env = "TARGET_URL")]
    pub target_url: String,

    // Port of the gated proxy listener
    #[arg(long, env = "PROXY_PORT", default_value_t = 8000)]
    pub proxy_port: u16,

    // Port of the admin listener
    #[arg(long, env = "ADMIN_PORT", default_value_t = 8080)]
    pub admin_port: u16,

    // Address both listeners bind to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: String,

    // Enrichment service base, queried as {base}{ip}/json
    #[arg(long, env = "GEO_URL", default_value = crate::geo::DEFAULT_GEO_URL)]
    pub geo_url: String,

    // Skip enrichment entirely
    #[arg(long, env = "NO_GEO", default_value_t = false)]
    pub no_geo: bool,

    // Enrichment request timeout in seconds
    #[arg(long, env = "GEO_TIMEOUT", default_value_t = DEFAULT_GEO_TIMEOUT.as_secs())]
    pub geo_timeout: u64,

    // Overall upstream request timeout in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT", default_value_t = DEFAULT_UPSTREAM_TIMEOUT.as_secs())]
    pub upstream_timeout: u64,

    // Expired-grant sweep interval in seconds (0 = never sweep)
    #[arg(long, env = "SWEEP_INTERVAL", default_value_t = 300)]
    pub sweep_interval: u64,
}

impl Args {
    pub fn geo_timeout(&self) -> Duration {
        Duration::from_secs(self.geo_timeout)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}
