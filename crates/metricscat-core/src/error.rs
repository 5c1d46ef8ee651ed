//! Error types for fetches and configuration.

use thiserror::Error;

/// Why a single backend fetch produced no usable data.
///
/// Fetch errors never escape a poll cycle: the affected store keeps its
/// previous contents and the next scheduled cycle is the retry.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not complete (timeout, refused connection, DNS).
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered, but not with a success status.
    #[error("backend returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    /// The body was not JSON of the expected shape.
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Short machine-friendly category for logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Status { .. } => "status",
            Self::Decode { .. } => "decode",
        }
    }
}

/// Invalid dashboard configuration, reported before polling starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("at least one metric name is required")]
    NoMetrics,
    #[error("metric name must not be empty")]
    EmptyMetricName,
    #[error("api url must start with http:// or https://, got {0:?}")]
    InvalidApiUrl(String),
    #[error("unknown metrics window {0:?} (expected minute1, minute5, minute15, hour1, hour4 or day)")]
    UnknownWindow(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_kind_and_message() {
        let source = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        let err = FetchError::Decode {
            url: "http://x/api/logs".into(),
            source,
        };
        assert_eq!(err.kind(), "decode");
        assert!(err.to_string().contains("http://x/api/logs"));
    }

    #[test]
    fn status_error_message_names_code() {
        let err = FetchError::Status {
            url: "http://x/api/metrics".into(),
            status: 503,
        };
        assert_eq!(err.kind(), "status");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn config_error_messages() {
        assert_eq!(
            ConfigError::ZeroInterval.to_string(),
            "poll interval must be greater than zero"
        );
        assert!(
            ConfigError::InvalidApiUrl("ftp://x".into())
                .to_string()
                .contains("ftp://x")
        );
    }
}
