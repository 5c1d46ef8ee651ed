//! Backend access: the two GET endpoints the dashboard polls.
//!
//! [`Backend`] is the seam the poll engine talks to; [`HttpBackend`] is the
//! real implementation over reqwest. Tests substitute in-memory backends.

use std::future::Future;

use serde::de::DeserializeOwned;

use crate::config::{DashboardConfig, MetricsWindow};
use crate::error::FetchError;
use crate::model::{LogLine, MetricPoint};

/// Source of metric windows and log batches.
pub trait Backend: Send + Sync + 'static {
    /// Full current window of one metric series.
    fn fetch_metric(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<MetricPoint>, FetchError>> + Send;

    /// Lines with offset greater than `cursor` (or everything available when
    /// `cursor` is `None`), newest first.
    fn fetch_logs(
        &self,
        cursor: Option<i64>,
    ) -> impl Future<Output = Result<Vec<LogLine>, FetchError>> + Send;
}

/// HTTP backend speaking `GET {base}/metrics` and `GET {base}/logs`.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    window: Option<MetricsWindow>,
}

impl HttpBackend {
    pub fn new(config: &DashboardConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: config.base_url().to_string(),
            window: config.window,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn metric_query(&self, name: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![("name", name.to_string())];
        if let Some(window) = self.window {
            query.push(("interval", window.as_query().to_string()));
        }
        query
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }
}

/// Query pairs for a log fetch: no `offset` until a cursor exists.
pub fn logs_query(cursor: Option<i64>) -> Vec<(&'static str, String)> {
    cursor
        .map(|offset| vec![("offset", offset.to_string())])
        .unwrap_or_default()
}

impl Backend for HttpBackend {
    async fn fetch_metric(&self, name: &str) -> Result<Vec<MetricPoint>, FetchError> {
        let query = self.metric_query(name);
        self.get_json("metrics", &query).await
    }

    async fn fetch_logs(&self, cursor: Option<i64>) -> Result<Vec<LogLine>, FetchError> {
        self.get_json("logs", &logs_query(cursor)).await
    }
}
