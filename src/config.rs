//! Dashboard configuration.
//!
//! Only the backend location and a few timings are configurable. The companion
//! service port is not part of this struct: it is fetched from the backend's
//! `/config` endpoint at bootstrap and kept in [`crate::state::UiState`].

use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_COMPANION_HOST: &str = "localhost";
pub const DEFAULT_OMNIPARSER_PORT: u16 = 8111;

pub const BACKEND_URL_ENV: &str = "AUTOMOY_BACKEND_URL";
pub const COMPANION_HOST_ENV: &str = "AUTOMOY_COMPANION_HOST";

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL of the Automoy backend, without trailing slash.
    pub backend_url: String,
    /// Host the companion (OmniParser) service listens on.
    pub companion_host: String,
    pub poll_interval: Duration,
    pub screenshot_interval: Duration,
    pub initial_screenshot_delay: Duration,
    /// Upper bound on how long the loading overlay may stay up.
    pub safety_timeout: Duration,
    /// Timeout for one-shot requests. The push stream has none.
    pub request_timeout: Duration,
    pub push_enabled: bool,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            companion_host: DEFAULT_COMPANION_HOST.to_string(),
            poll_interval: Duration::from_millis(1000),
            screenshot_interval: Duration::from_secs(3),
            initial_screenshot_delay: Duration::from_secs(1),
            safety_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(10),
            push_enabled: true,
            reconnect_initial: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

impl DashboardConfig {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: normalize_base_url(backend_url.into()),
            ..Default::default()
        }
    }

    pub fn with_companion_host(mut self, host: impl Into<String>) -> Self {
        self.companion_host = host.into();
        self
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
