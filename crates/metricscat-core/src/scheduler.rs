//! Recurring poll timer with an explicit start/stop lifecycle.
//!
//! The scheduler only decides *when* a cycle runs. The cycle callback is
//! expected to dispatch its fetches and return, so cycles may overlap when a
//! fetch outlives the interval. Stopping cancels the timer, never the work a
//! cycle already dispatched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Token for the running timer, handed back to [`PollScheduler::stop`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping the handle leaves the timer running until the scheduler is dropped"]
pub struct PollHandle {
    id: u64,
}

struct ActivePoll {
    id: u64,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ActivePoll {
    fn cancel(self) {
        self.stopped.store(true, Ordering::Release);
        self.task.abort();
    }
}

/// Drives a cycle callback once per interval on a tokio runtime.
pub struct PollScheduler {
    runtime: Handle,
    next_id: u64,
    active: Option<ActivePoll>,
}

impl PollScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: 1,
            active: None,
        }
    }

    /// Fire `cycle` every `interval`, first after one full interval.
    ///
    /// Only one timer runs per scheduler; starting again stops the previous
    /// one first.
    pub fn start<F>(&mut self, interval: Duration, mut cycle: F) -> PollHandle
    where
        F: FnMut() + Send + 'static,
    {
        if let Some(previous) = self.active.take() {
            log::debug!("replacing poll timer #{}", previous.id);
            previous.cancel();
        }

        let id = self.next_id;
        self.next_id += 1;
        let period = interval.max(Duration::from_millis(1));
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);

        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                cycle();
            }
        });

        log::info!("poll timer #{id} started ({} ms)", period.as_millis());
        self.active = Some(ActivePoll { id, stopped, task });
        PollHandle { id }
    }

    /// Stop the timer identified by `handle`. Stale handles are ignored.
    pub fn stop(&mut self, handle: PollHandle) {
        match self.active.take() {
            Some(active) if active.id == handle.id => {
                log::info!("poll timer #{} stopped", active.id);
                active.cancel();
            }
            other => self.active = other,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel();
        }
    }
}
