//! Client configuration.

use std::env;
use std::time::Duration;

use crate::error::ZoektError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 6070;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server root, e.g. `http://localhost:6070`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts made for a search before giving up on transport errors.
    pub max_retries: u32,
    /// Base delay between attempts; doubled after each one.
    pub retry_backoff: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl ClientConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_base_url(&format!("http://{host}:{port}"))
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            user_agent: format!("zoekt-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Read `ZOEKT_URL`, or `ZOEKT_HOST`/`ZOEKT_PORT`, plus `ZOEKT_TIMEOUT` in seconds.
    pub fn from_env() -> Result<Self, ZoektError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ZoektError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("ZOEKT_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ZoektError::Config(format!("ZOEKT_PORT={raw:?}: {e}")))?,
            None => DEFAULT_PORT,
        };
        let host = var("ZOEKT_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let mut config = Self::from_endpoint(var("ZOEKT_URL").as_deref(), &host, port);

        if let Some(raw) = var("ZOEKT_TIMEOUT") {
            let secs = raw
                .trim()
                .parse::<f64>()
                .map_err(|e| ZoektError::Config(format!("ZOEKT_TIMEOUT={raw:?}: {e}")))?;
            config.timeout = timeout_from_secs(secs)?;
        }
        Ok(config)
    }

    /// A non-blank `url` wins over `host` and `port`.
    pub fn from_endpoint(url: Option<&str>, host: &str, port: u16) -> Self {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Self::with_base_url(url),
            None => Self::new(host.trim(), port),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn search_url(&self) -> String {
        format!("{}/api/search", self.base_url)
    }

    pub fn list_url(&self) -> String {
        format!("{}/api/list", self.base_url)
    }

    /// Delay before the attempt following `attempt` (0-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Timeout given in (possibly fractional) seconds.
pub(crate) fn timeout_from_secs(secs: f64) -> Result<Duration, ZoektError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ZoektError::Config(format!("invalid timeout {secs}: {e}")))
}
