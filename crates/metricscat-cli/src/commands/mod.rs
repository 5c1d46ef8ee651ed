pub mod dashboard;
pub mod snapshot;
pub mod tail;

use std::time::Duration;

use metricscat_core::{ConfigError, DashboardConfig, parse_metric_list};

use crate::PollArgs;

/// Build and validate a config from CLI flags layered over the environment.
pub fn make_config(args: &PollArgs) -> Result<DashboardConfig, ConfigError> {
    let mut config = DashboardConfig::from_env();

    if let Some(api) = &args.api {
        config.api_url = api.trim().to_string();
    }
    if let Some(list) = &args.metrics {
        config.metrics = parse_metric_list(list);
    }
    if let Some(window) = &args.window {
        config.window = Some(window.parse()?);
    }
    config.interval = Duration::from_millis(args.interval_ms);
    config.retention = args.retention;
    config.request_timeout = Duration::from_millis(args.timeout_ms);

    config.validate()?;
    Ok(config)
}

/// Resolve the config or exit with a message, as every subcommand needs one.
pub fn config_or_exit(args: &PollArgs) -> DashboardConfig {
    match make_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: invalid configuration: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metricscat_core::MetricsWindow;

    fn args() -> PollArgs {
        PollArgs {
            api: Some("http://example.test/api/".into()),
            interval_ms: 250,
            retention: 10,
            metrics: None,
            window: None,
            timeout_ms: 1000,
        }
    }

    #[test]
    fn flags_override_defaults() {
        let config = make_config(&PollArgs {
            metrics: Some("cpu, mem,,".into()),
            window: Some("5m".into()),
            ..args()
        })
        .unwrap();
        assert_eq!(config.base_url(), "http://example.test/api");
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.retention, 10);
        assert_eq!(config.metrics, vec!["cpu", "mem"]);
        assert_eq!(config.window, Some(MetricsWindow::Minute5));
        assert_eq!(config.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = make_config(&PollArgs {
            interval_ms: 0,
            ..args()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroInterval);
    }

    #[test]
    fn unknown_window_is_rejected() {
        let err = make_config(&PollArgs {
            window: Some("fortnight".into()),
            ..args()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownWindow("fortnight".into()));
    }

    #[test]
    fn blank_metric_list_is_rejected() {
        let err = make_config(&PollArgs {
            metrics: Some(" , ".into()),
            ..args()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::NoMetrics);
    }
}
