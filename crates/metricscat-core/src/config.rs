//! Dashboard configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::logs::DEFAULT_RETENTION;

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "METRICSCAT_API_URL";

/// Backend base URL used when neither a flag nor the environment sets one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Metrics charted by default.
pub const DEFAULT_METRICS: [&str; 2] = ["system.cpu.utilization", "system.mem.used"];

/// Look-back window the backend applies to `GET /metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsWindow {
    Minute1,
    Minute5,
    Minute15,
    Hour1,
    Hour4,
    Day,
}

impl MetricsWindow {
    /// Value sent as the `interval=` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Minute1 => "minute1",
            Self::Minute5 => "minute5",
            Self::Minute15 => "minute15",
            Self::Hour1 => "hour1",
            Self::Hour4 => "hour4",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for MetricsWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for MetricsWindow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute1" | "1m" => Ok(Self::Minute1),
            "minute5" | "5m" => Ok(Self::Minute5),
            "minute15" | "15m" => Ok(Self::Minute15),
            "hour1" | "1h" => Ok(Self::Hour1),
            "hour4" | "4h" => Ok(Self::Hour4),
            "day" | "1d" => Ok(Self::Day),
            _ => Err(ConfigError::UnknownWindow(s.to_string())),
        }
    }
}

/// Everything needed to poll one backend.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL the `/metrics` and `/logs` paths are appended to.
    pub api_url: String,
    /// Time between poll cycles.
    pub interval: Duration,
    /// Previously displayed log lines carried into each merged tail.
    pub retention: usize,
    /// Metric series fetched every cycle.
    pub metrics: Vec<String>,
    /// Optional look-back window forwarded to the backend.
    pub window: Option<MetricsWindow>,
    /// Per-request timeout; a slow request fails as a network error.
    pub request_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            interval: Duration::from_millis(1000),
            retention: DEFAULT_RETENTION,
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            window: None,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl DashboardConfig {
    /// Defaults, with the API URL taken from `METRICSCAT_API_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            config.api_url = url.trim().to_string();
        }
        config
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }
        if self.metrics.iter().any(|m| m.trim().is_empty()) {
            return Err(ConfigError::EmptyMetricName);
        }
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }
        Ok(())
    }
}

/// Parse a comma-separated metric list, dropping blank entries.
pub fn parse_metric_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
