//! # metricscat-core
//!
//! **The polling and merge engine behind the metricscat dashboard.**
//!
//! `metricscat-core` polls a metrics/logs backend on a timer and keeps two
//! pieces of client-side state up to date: the latest window of each metric
//! series, and a bounded, newest-first tail of the log stream advanced by an
//! offset cursor.
//!
//! ## Quick Start
//!
//! ```no_run
//! use metricscat_core::{Dashboard, DashboardConfig, HttpBackend, PollScheduler};
//!
//! # async fn demo() {
//! let config = DashboardConfig::from_env();
//! let dashboard = Dashboard::new(HttpBackend::new(&config), &config);
//!
//! let mut scheduler = PollScheduler::new(tokio::runtime::Handle::current());
//! let handle = dashboard.start(&mut scheduler, config.interval);
//!
//! // ... render dashboard.snapshot() on your own cadence ...
//!
//! scheduler.stop(handle);
//! # }
//! ```
//!
//! ## Architecture
//!
//! Scheduler tick → one task per metric + one log task → each task updates
//! its own store → renderer reads a [`DashboardSnapshot`].
//!
//! - [`MetricSeriesStore`] replaces a series wholesale on every successful fetch.
//! - [`LogTailStore`] prepends each batch and carries forward at most
//!   `retention` older lines.
//! - [`PollScheduler`] owns the timer; stopping it never cancels fetches that
//!   are already in flight.
//!
//! Fetch failures are logged and counted, never propagated: the affected store
//! simply keeps its previous contents until the next cycle.

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod logs;
pub mod metrics;
pub mod model;
pub mod render;
pub mod scheduler;

pub use backend::{Backend, HttpBackend};
pub use config::{
    API_URL_ENV, DEFAULT_API_URL, DEFAULT_METRICS, DashboardConfig, MetricsWindow,
    parse_metric_list,
};
pub use engine::{CycleStats, Dashboard, DashboardSnapshot};
pub use error::{ConfigError, FetchError};
pub use logs::{DEFAULT_RETENTION, LogTailStore};
pub use metrics::MetricSeriesStore;
pub use model::{LogLevel, LogLine, MetricPoint};
pub use render::Render;
pub use scheduler::{PollHandle, PollScheduler};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
