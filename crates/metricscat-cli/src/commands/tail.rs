//! Plain-text follower: new log lines and metric values as they land.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metricscat_core::{Dashboard, HttpBackend, LogLine, MetricPoint, PollScheduler, Render};

use crate::PollArgs;

/// How often the main thread checks for landed fetches and Ctrl+C.
const WAKE_INTERVAL: Duration = Duration::from_millis(100);

/// Writes only what changed since the previous render.
pub struct PlainRenderer<W: Write> {
    out: W,
    last_offset: Option<i64>,
    last_values: BTreeMap<String, f64>,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_offset: None,
            last_values: BTreeMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(
        &mut self,
        metrics: &BTreeMap<String, Vec<MetricPoint>>,
        logs: &[LogLine],
    ) -> io::Result<()> {
        for (name, series) in metrics {
            let Some(latest) = series.last() else {
                continue;
            };
            if self.last_values.get(name) != Some(&latest.value) {
                writeln!(self.out, "[metric] {name} = {:.3}", latest.value)?;
                self.last_values.insert(name.clone(), latest.value);
            }
        }

        // The tail is newest-first; print unseen lines oldest-first.
        let unseen: Vec<&LogLine> = logs
            .iter()
            .filter(|l| self.last_offset.is_none_or(|seen| l.offset > seen))
            .collect();
        for line in unseen.iter().rev() {
            match line.level {
                Some(level) => writeln!(
                    self.out,
                    "{} {:<5} {}",
                    line.recorded_at,
                    level.label(),
                    line.line
                )?,
                None => writeln!(self.out, "{} {}", line.recorded_at, line.line)?,
            }
        }
        if let Some(newest) = unseen.iter().map(|l| l.offset).max() {
            self.last_offset = Some(newest);
        }
        self.out.flush()
    }
}

impl<W: Write> Render for PlainRenderer<W> {
    fn render(&mut self, metrics: &BTreeMap<String, Vec<MetricPoint>>, logs: &[LogLine]) {
        if let Err(e) = self.write_frame(metrics, logs) {
            log::warn!("failed to write output: {e}");
        }
    }
}

pub fn run(args: &PollArgs) {
    let config = super::config_or_exit(args);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Error setting Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let dashboard = Dashboard::new(HttpBackend::new(&config), &config);
    let mut scheduler = PollScheduler::new(runtime.handle().clone());
    let mut renderer = PlainRenderer::new(io::stdout().lock());

    eprintln!(
        "Following {} every {}ms. Press Ctrl+C to stop.",
        config.base_url(),
        config.interval.as_millis()
    );

    runtime.block_on(dashboard.run_cycle());
    dashboard.render_to(&mut renderer);
    let handle = dashboard.start(&mut scheduler, config.interval);

    let mut landed = landed_fetches(&dashboard);
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(WAKE_INTERVAL);
        let now = landed_fetches(&dashboard);
        if now != landed {
            landed = now;
            dashboard.render_to(&mut renderer);
        }
    }

    scheduler.stop(handle);
    let stats = dashboard.stats();
    eprintln!(
        "\n{} cycles, {} fetches applied, {} failed.",
        stats.cycles, stats.applied, stats.failed
    );
}

fn landed_fetches(dashboard: &Dashboard<HttpBackend>) -> u64 {
    let stats = dashboard.stats();
    stats.applied + stats.failed
}
