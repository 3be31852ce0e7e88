use std::net::{IpAddr, Ipv4Addr};

use tracing::level_filters::LevelFilter;

pub const COLLECTION_INTERVAL: &str = "COLLECTION_INTERVAL";
pub const ALERT_THRESHOLD_CPU: &str = "ALERT_THRESHOLD_CPU";
pub const ALERT_THRESHOLD_MEMORY: &str = "ALERT_THRESHOLD_MEMORY";
pub const ALERT_THRESHOLD_DISK: &str = "ALERT_THRESHOLD_DISK";
pub const API_HOST: &str = "API_HOST";
pub const API_PORT: &str = "API_PORT";

const LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_PORT: u16 = 8000;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

pub fn get_default_host() -> IpAddr {
    DEFAULT_HOST
}

/// Log level from `LOG_LEVEL`, falling back to `INFO` when unset or invalid
pub fn get_log_level() -> LevelFilter {
    let level_from_env = std::env::var(LOG_LEVEL);
    level_from_env.map_or(LevelFilter::INFO, |res| {
        res.parse().unwrap_or(LevelFilter::INFO)
    })
}

/// Lookup function for [`crate::config::Config::apply_overrides`] backed by the process environment
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
