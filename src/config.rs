//! Client configuration.
//!
//! Built with `with_*` methods or read from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `PORTAL_API_URL` | `api_base_url` | `http://localhost:8000` |
//! | `PORTAL_WS_URL` | `channel.base_url` | `ws://localhost:8000/ws` |
//! | `PORTAL_REQUEST_TIMEOUT_SECS` | `request_timeout` | 30 s |
//! | `PORTAL_WS_MAX_ATTEMPTS` | `channel.max_attempts` | 3 |
//! | `PORTAL_WS_RECONNECT_MS` | `channel.reconnect_interval` | 5000 ms |

use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// How long to wait between connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Always wait `reconnect_interval`.
    Fixed,
    /// Wait `reconnect_interval * 2^(n-1)` before the n-th retry, capped.
    Exponential { max_interval: Duration },
}

/// Duplex channel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Base URL; the target id is appended as the last path segment
    pub base_url: String,
    /// Connection attempts allowed per `connect()`, the first one included
    pub max_attempts: u32,
    pub reconnect_interval: Duration,
    pub policy: ReconnectPolicy,
    /// Query parameter carrying the access token
    pub token_param: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WS_URL.to_string(),
            max_attempts: 3,
            reconnect_interval: Duration::from_secs(5),
            policy: ReconnectPolicy::Fixed,
            token_param: "token".to_string(),
        }
    }
}

impl ChannelConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_token_param(mut self, param: impl Into<String>) -> Self {
        self.token_param = param.into();
        self
    }

    /// Delay before connection attempt number `attempt` (2 = first retry).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        match self.policy {
            ReconnectPolicy::Fixed => self.reconnect_interval,
            ReconnectPolicy::Exponential { max_interval } => {
                let exponent = attempt.saturating_sub(2).min(16);
                self.reconnect_interval
                    .saturating_mul(1u32 << exponent)
                    .min(max_interval)
            }
        }
    }
}

/// Settings for the HTTP clients and the duplex channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Path of the token refresh endpoint, relative to `api_base_url`
    pub refresh_path: String,
    pub channel: ChannelConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            channel: ChannelConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from `PORTAL_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("PORTAL_API_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = std::env::var("PORTAL_WS_URL") {
            config.channel.base_url = url;
        }
        if let Some(secs) = env_parse::<u64>("PORTAL_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_parse::<u32>("PORTAL_WS_MAX_ATTEMPTS") {
            config.channel.max_attempts = attempts;
        }
        if let Some(ms) = env_parse::<u64>("PORTAL_WS_RECONNECT_MS") {
            config.channel.reconnect_interval = Duration::from_millis(ms);
        }

        config
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_ws_base_url(mut self, url: impl Into<String>) -> Self {
        self.channel.base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    /// Absolute URL for an API path.
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.api_base_url, path)
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}
