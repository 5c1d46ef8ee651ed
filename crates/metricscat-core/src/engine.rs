//! Fetch-cycle orchestration.
//!
//! One cycle issues one fetch per configured metric plus one log fetch. Each
//! fetch runs as its own task and writes only to its own store, so a failure
//! in one never blocks or corrupts the others; the failed store keeps its
//! previous contents until a later cycle succeeds.
//!
//! Results that land after the scheduler was stopped are still applied.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::config::DashboardConfig;
use crate::logs::LogTailStore;
use crate::metrics::MetricSeriesStore;
use crate::model::{LogLine, MetricPoint};
use crate::render::Render;
use crate::scheduler::{PollHandle, PollScheduler};

/// Lock a store, recovering the data if a previous holder panicked.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CycleCounters {
    cycles: AtomicU64,
    applied: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time view of the poll counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Cycles dispatched.
    pub cycles: u64,
    /// Fetches whose result reached a store.
    pub applied: u64,
    /// Fetches that failed and left their store untouched.
    pub failed: u64,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Both stores and the counters, captured for one render.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    pub logs: Vec<LogLine>,
    pub cursor: Option<i64>,
    pub stats: CycleStats,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Owns the two stores and polls a [`Backend`] into them.
///
/// Cheap to clone; clones share the same stores.
pub struct Dashboard<B: Backend> {
    backend: Arc<B>,
    metric_names: Arc<[String]>,
    metrics: Arc<Mutex<MetricSeriesStore>>,
    logs: Arc<Mutex<LogTailStore>>,
    counters: Arc<CycleCounters>,
}

impl<B: Backend> Clone for Dashboard<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            metric_names: Arc::clone(&self.metric_names),
            metrics: Arc::clone(&self.metrics),
            logs: Arc::clone(&self.logs),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<B: Backend> Dashboard<B> {
    pub fn new(backend: B, config: &DashboardConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            metric_names: config.metrics.iter().cloned().collect(),
            metrics: Arc::new(Mutex::new(MetricSeriesStore::new())),
            logs: Arc::new(Mutex::new(LogTailStore::new(config.retention))),
            counters: Arc::new(CycleCounters::default()),
        }
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    /// Issue one cycle's fetches and return without waiting for them.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch_cycle(&self) -> Vec<JoinHandle<()>> {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        let mut tasks = Vec::with_capacity(self.metric_names.len() + 1);

        for name in self.metric_names.iter() {
            let this = self.clone();
            let name = name.clone();
            tasks.push(tokio::spawn(async move { this.refresh_metric(&name).await }));
        }

        let this = self.clone();
        tasks.push(tokio::spawn(async move { this.refresh_logs().await }));

        tasks
    }

    /// Run one full cycle and wait for every fetch to settle.
    pub async fn run_cycle(&self) {
        for task in self.dispatch_cycle() {
            if let Err(e) = task.await {
                log::warn!("fetch task ended abnormally: {e}");
            }
        }
    }

    /// Start polling on `scheduler` every `interval`.
    pub fn start(&self, scheduler: &mut PollScheduler, interval: Duration) -> PollHandle {
        let this = self.clone();
        scheduler.start(interval, move || {
            this.dispatch_cycle();
        })
    }

    async fn refresh_metric(&self, name: &str) {
        match self.backend.fetch_metric(name).await {
            Ok(series) => {
                log::debug!("{name}: {} points", series.len());
                lock(&self.metrics).update(name, series);
                self.counters.applied.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                log::warn!("{name}: keeping previous series ({} error: {e})", e.kind());
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    async fn refresh_logs(&self) {
        let cursor = lock(&self.logs).cursor();
        match self.backend.fetch_logs(cursor).await {
            Ok(batch) => {
                log::debug!("logs: {} new lines after {cursor:?}", batch.len());
                lock(&self.logs).ingest(batch);
                self.counters.applied.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                log::warn!("logs: keeping previous tail ({} error: {e})", e.kind());
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    // --- Read access ---

    pub fn metric(&self, name: &str) -> Vec<MetricPoint> {
        lock(&self.metrics).get(name).to_vec()
    }

    pub fn logs(&self) -> Vec<LogLine> {
        lock(&self.logs).get().to_vec()
    }

    pub fn cursor(&self) -> Option<i64> {
        lock(&self.logs).cursor()
    }

    pub fn stats(&self) -> CycleStats {
        CycleStats {
            cycles: self.counters.cycles.load(Ordering::Relaxed),
            applied: self.counters.applied.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let metrics = lock(&self.metrics).snapshot();
        let (logs, cursor) = {
            let tail = lock(&self.logs);
            (tail.get().to_vec(), tail.cursor())
        };
        DashboardSnapshot {
            metrics,
            logs,
            cursor,
            stats: self.stats(),
        }
    }

    /// Hand the current state to a renderer.
    pub fn render_to<R: Render + ?Sized>(&self, renderer: &mut R) {
        let snapshot = self.snapshot();
        renderer.render(&snapshot.metrics, &snapshot.logs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Semaphore;

    fn point(value: f64) -> MetricPoint {
        MetricPoint {
            timestamp: value,
            value,
        }
    }

    fn decode_error() -> FetchError {
        FetchError::Decode {
            url: "test".into(),
            source: serde_json::from_str::<Vec<u8>>("{").unwrap_err(),
        }
    }

    /// Scripted backend: metrics answer from a fixed map (missing = error),
    /// log fetches pop queued responses and record the cursor they saw.
    #[derive(Default)]
    struct ScriptedBackend {
        metrics: Mutex<BTreeMap<String, Vec<MetricPoint>>>,
        log_batches: Mutex<VecDeque<Result<Vec<LogLine>, FetchError>>>,
        seen_cursors: Mutex<Vec<Option<i64>>>,
        /// Log fetches wait for a permit when set.
        gate: Option<Arc<Semaphore>>,
        panic_next_log_fetch: AtomicBool,
    }

    impl Backend for ScriptedBackend {
        async fn fetch_metric(&self, name: &str) -> Result<Vec<MetricPoint>, FetchError> {
            lock(&self.metrics)
                .get(name)
                .cloned()
                .ok_or_else(decode_error)
        }

        async fn fetch_logs(&self, cursor: Option<i64>) -> Result<Vec<LogLine>, FetchError> {
            lock(&self.seen_cursors).push(cursor);
            if let Some(gate) = &self.gate
                && let Ok(permit) = gate.acquire().await
            {
                permit.forget();
            }
            if self.panic_next_log_fetch.swap(false, Ordering::SeqCst) {
                panic!("log backend crashed");
            }
            lock(&self.log_batches)
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn config() -> DashboardConfig {
        DashboardConfig {
            metrics: vec!["cpu".into(), "mem".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cycle_updates_every_store() {
        let backend = ScriptedBackend::default();
        lock(&backend.metrics).insert("cpu".into(), vec![point(1.0), point(2.0)]);
        lock(&backend.metrics).insert("mem".into(), vec![point(3.0)]);
        lock(&backend.log_batches).push_back(Ok(vec![
            LogLine::new(5, "t", "b"),
            LogLine::new(4, "t", "a"),
        ]));

        let dash = Dashboard::new(backend, &config());
        dash.run_cycle().await;

        assert_eq!(dash.metric("cpu"), vec![point(1.0), point(2.0)]);
        assert_eq!(dash.metric("mem"), vec![point(3.0)]);
        assert_eq!(dash.cursor(), Some(5));
        assert_eq!(dash.logs().len(), 2);
        assert_eq!(
            dash.stats(),
            CycleStats {
                cycles: 1,
                applied: 3,
                failed: 0,
            }
        );
    }

    #[tokio::test]
    async fn failed_metric_keeps_stale_series_and_siblings_apply() {
        let backend = ScriptedBackend::default();
        lock(&backend.metrics).insert("cpu".into(), vec![point(1.0)]);
        lock(&backend.metrics).insert("mem".into(), vec![point(2.0)]);
        let dash = Dashboard::new(backend, &config());
        dash.run_cycle().await;

        // cpu starts failing, mem and logs keep working.
        lock(&dash.backend.metrics).remove("cpu");
        lock(&dash.backend.metrics).insert("mem".into(), vec![point(9.0)]);
        lock(&dash.backend.log_batches).push_back(Ok(vec![LogLine::new(1, "t", "x")]));
        dash.run_cycle().await;

        assert_eq!(dash.metric("cpu"), vec![point(1.0)]);
        assert_eq!(dash.metric("mem"), vec![point(9.0)]);
        assert_eq!(dash.cursor(), Some(1));
        assert_eq!(dash.stats().failed, 1);
    }

    #[tokio::test]
    async fn failed_log_fetch_keeps_tail_and_cursor() {
        let backend = ScriptedBackend::default();
        lock(&backend.log_batches).push_back(Ok(vec![LogLine::new(3, "t", "x")]));
        lock(&backend.log_batches).push_back(Err(decode_error()));
        let dash = Dashboard::new(backend, &config());

        dash.run_cycle().await;
        dash.run_cycle().await;

        assert_eq!(dash.cursor(), Some(3));
        assert_eq!(dash.logs(), vec![LogLine::new(3, "t", "x")]);
    }

    #[tokio::test]
    async fn log_fetch_sends_current_cursor() {
        let backend = ScriptedBackend::default();
        lock(&backend.log_batches).push_back(Ok(vec![
            LogLine::new(5, "t", "b"),
            LogLine::new(4, "t", "a"),
        ]));
        lock(&backend.log_batches).push_back(Ok(Vec::new()));
        lock(&backend.log_batches).push_back(Ok(vec![LogLine::new(6, "t", "c")]));
        let dash = Dashboard::new(backend, &config());

        for _ in 0..3 {
            dash.run_cycle().await;
        }

        assert_eq!(
            *lock(&dash.backend.seen_cursors),
            vec![None, Some(5), Some(5)]
        );
        let offsets: Vec<i64> = dash.logs().iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![6, 5, 4]);
    }

    fn gated() -> (Arc<Semaphore>, ScriptedBackend) {
        let gate = Arc::new(Semaphore::new(0));
        let backend = ScriptedBackend {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        (gate, backend)
    }

    #[tokio::test]
    async fn overlapping_cycles_each_issue_a_log_fetch() {
        let (gate, backend) = gated();
        lock(&backend.log_batches).push_back(Ok(vec![LogLine::new(1, "t", "x")]));
        let dash = Dashboard::new(backend, &config());

        let first = dash.dispatch_cycle();
        let second = dash.dispatch_cycle();
        assert_eq!(second.len(), 3);

        // Both log fetches are parked before either can land, so they go out
        // from the same cursor.
        while lock(&dash.backend.seen_cursors).len() < 2 {
            tokio::task::yield_now().await;
        }
        gate.add_permits(2);
        for task in first.into_iter().chain(second) {
            task.await.unwrap();
        }

        assert_eq!(*lock(&dash.backend.seen_cursors), vec![None, None]);
        assert_eq!(dash.cursor(), Some(1));
        assert_eq!(dash.stats().cycles, 2);
    }

    #[tokio::test]
    async fn aborted_log_fetch_does_not_stop_later_cycles() {
        let (gate, backend) = gated();
        let dash = Dashboard::new(backend, &config());

        let first = dash.dispatch_cycle();
        while lock(&dash.backend.seen_cursors).is_empty() {
            tokio::task::yield_now().await;
        }
        for task in &first {
            task.abort();
        }
        for task in first {
            let _ = task.await;
        }

        gate.add_permits(10);
        lock(&dash.backend.log_batches).push_back(Ok(vec![LogLine::new(4, "t", "a")]));
        dash.run_cycle().await;
        assert_eq!(dash.cursor(), Some(4));

        lock(&dash.backend.log_batches).push_back(Ok(vec![LogLine::new(5, "t", "b")]));
        dash.run_cycle().await;
        assert_eq!(dash.cursor(), Some(5));
        assert_eq!(lock(&dash.backend.seen_cursors).last(), Some(&Some(4)));
    }

    #[tokio::test]
    async fn panicking_log_fetch_does_not_stop_later_cycles() {
        let backend = ScriptedBackend {
            panic_next_log_fetch: AtomicBool::new(true),
            ..Default::default()
        };
        lock(&backend.log_batches).push_back(Ok(vec![LogLine::new(2, "t", "x")]));
        let dash = Dashboard::new(backend, &config());

        dash.run_cycle().await;
        assert_eq!(dash.cursor(), None);

        dash.run_cycle().await;
        assert_eq!(dash.cursor(), Some(2));
        assert_eq!(*lock(&dash.backend.seen_cursors), vec![None, None]);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_log_result_is_applied_after_stop() {
        let (gate, backend) = gated();
        lock(&backend.log_batches).push_back(Ok(vec![LogLine::new(9, "t", "late")]));
        let dash = Dashboard::new(backend, &config());
        let mut scheduler = PollScheduler::new(tokio::runtime::Handle::current());

        let handle = dash.start(&mut scheduler, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop(handle);
        assert_eq!(dash.cursor(), None);

        gate.add_permits(1);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(dash.cursor(), Some(9));
        assert_eq!(dash.logs(), vec![LogLine::new(9, "t", "late")]);
        assert_eq!(dash.stats().cycles, 1);
    }

    #[tokio::test]
    async fn render_receives_current_state() {
        struct Capture(Vec<(usize, usize)>);
        impl Render for Capture {
            fn render(
                &mut self,
                metrics: &BTreeMap<String, Vec<MetricPoint>>,
                logs: &[LogLine],
            ) {
                self.0.push((metrics.len(), logs.len()));
            }
        }

        let backend = ScriptedBackend::default();
        lock(&backend.metrics).insert("cpu".into(), vec![point(1.0)]);
        lock(&backend.log_batches).push_back(Ok(vec![LogLine::new(1, "t", "x")]));
        let dash = Dashboard::new(backend, &config());

        let mut capture = Capture(Vec::new());
        dash.render_to(&mut capture);
        dash.run_cycle().await;
        dash.render_to(&mut capture);

        assert_eq!(capture.0, vec![(0, 0), (1, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_polling_applies_each_interval() {
        let backend = ScriptedBackend::default();
        for offset in 1..=3 {
            lock(&backend.log_batches).push_back(Ok(vec![LogLine::new(offset, "t", "x")]));
        }
        let dash = Dashboard::new(backend, &config());
        let mut scheduler = PollScheduler::new(tokio::runtime::Handle::current());

        let handle = dash.start(&mut scheduler, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(350)).await;
        scheduler.stop(handle);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(dash.stats().cycles, 3);
        assert_eq!(dash.cursor(), Some(3));
        let offsets: Vec<i64> = dash.logs().iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![3, 2, 1]);
    }
}
