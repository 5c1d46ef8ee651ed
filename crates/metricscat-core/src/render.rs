//! Presentation seam.

use std::collections::BTreeMap;

use crate::model::{LogLine, MetricPoint};

/// Consumer of dashboard state (terminal UI, plain text, tests).
///
/// Called with the current contents of both stores; implementations must
/// tolerate being called with unchanged state.
pub trait Render {
    fn render(&mut self, metrics: &BTreeMap<String, Vec<MetricPoint>>, logs: &[LogLine]);
}
