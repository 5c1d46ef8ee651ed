//! Wire types returned by the metrics/logs backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One measured value of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: f64,
    pub value: f64,
}

/// Severity attached to a log line by the collecting agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Notice,
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Notice => "NOTICE",
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One line of the backend's log stream.
///
/// `offset` is assigned by the backend and strictly increases; it doubles as
/// the pagination cursor for the next fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub offset: i64,
    pub recorded_at: String,
    pub line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
}

impl LogLine {
    pub fn new(offset: i64, recorded_at: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            offset,
            recorded_at: recorded_at.into(),
            line: line.into(),
            level: None,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }
}
