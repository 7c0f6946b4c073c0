use std::env;

pub const DEFAULT_REVALIDATE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_FIXTURE_LIMIT: usize = 5;

#[derive(Clone, Debug)]
pub struct Config {
    pub revalidate_interval_secs: u64,
    pub status_interval_secs: u64,
    pub fixture_limit: usize,
    /// Ask the backend to rescrape before warming the cache
    pub backend_refresh_on_start: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            revalidate_interval_secs: env::var("REVALIDATE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REVALIDATE_INTERVAL_SECS),
            status_interval_secs: env::var("STATUS_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_STATUS_INTERVAL_SECS),
            fixture_limit: env::var("FIXTURE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FIXTURE_LIMIT),
            backend_refresh_on_start: env::var("BACKEND_REFRESH_ON_START")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}
