//! Latest snapshot of each named metric series.
//!
//! The backend always returns the full current window for a metric, so there
//! is no merging here: a successful fetch replaces the series wholesale and a
//! failed fetch simply never reaches [`MetricSeriesStore::update`].

use std::collections::BTreeMap;

use crate::model::MetricPoint;

/// Metric name → ordered points, replaced in full on every update.
#[derive(Debug, Clone, Default)]
pub struct MetricSeriesStore {
    series: BTreeMap<String, Vec<MetricPoint>>,
}

impl MetricSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored series for `name`.
    pub fn update(&mut self, name: &str, series: Vec<MetricPoint>) {
        self.series.insert(name.to_string(), series);
    }

    /// Current series for `name`, or an empty slice if it was never fetched.
    pub fn get(&self, name: &str) -> &[MetricPoint] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most recent point of a series.
    pub fn latest(&self, name: &str) -> Option<MetricPoint> {
        self.get(name).last().copied()
    }

    /// Names that have received at least one update.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Owned copy of every series, for handing to a renderer.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<MetricPoint>> {
        self.series.clone()
    }
}
