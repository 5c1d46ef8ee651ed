//! TUI application state and event loop.
//!
//! Polling runs on a tokio runtime owned by the app; the event loop on the
//! main thread only reads store snapshots, so a slow backend never blocks
//! input or drawing.

use std::collections::BTreeMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use metricscat_core::{
    CycleStats, Dashboard, DashboardConfig, HttpBackend, LogLine, MetricPoint, PollHandle,
    PollScheduler, Render,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How often the screen is redrawn from the stores.
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Bounds for interactive poll-interval changes.
const MIN_INTERVAL: Duration = Duration::from_millis(100);
const MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Halve the interval, never below [`MIN_INTERVAL`].
pub fn faster(interval: Duration) -> Duration {
    (interval / 2).max(MIN_INTERVAL)
}

/// Double the interval, never above [`MAX_INTERVAL`].
pub fn slower(interval: Duration) -> Duration {
    (interval * 2).min(MAX_INTERVAL)
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Store contents captured for the current frame.
#[derive(Debug, Default)]
pub struct View {
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    pub logs: Vec<LogLine>,
}

impl Render for View {
    fn render(&mut self, metrics: &BTreeMap<String, Vec<MetricPoint>>, logs: &[LogLine]) {
        self.metrics.clone_from(metrics);
        self.logs.clear();
        self.logs.extend_from_slice(logs);
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    dashboard: Dashboard<HttpBackend>,
    scheduler: PollScheduler,
    handle: Option<PollHandle>,
    api_url: String,
    interval: Duration,
    running: bool,
    log_scroll: usize,
    view: View,
    stats: CycleStats,
    /// Declared last so the timer task is cancelled before the runtime goes.
    runtime: tokio::runtime::Runtime,
}

impl App {
    pub fn new(config: DashboardConfig) -> io::Result<Self> {
        let runtime = tokio::runtime::Runtime::new()?;
        let scheduler = PollScheduler::new(runtime.handle().clone());
        let dashboard = Dashboard::new(HttpBackend::new(&config), &config);

        Ok(Self {
            dashboard,
            scheduler,
            handle: None,
            api_url: config.base_url().to_string(),
            interval: config.interval,
            running: true,
            log_scroll: 0,
            view: View::default(),
            stats: CycleStats::default(),
            runtime,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        self.pause();
        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        // Fill the screen right away instead of waiting a full interval.
        self.refresh_now();
        self.resume();
        let mut last_frame: Option<Instant> = None;

        while self.running {
            if last_frame.is_none_or(|t| t.elapsed() >= FRAME_INTERVAL) {
                self.dashboard.render_to(&mut self.view);
                self.clamp_log_scroll();
                self.stats = self.dashboard.stats();
                terminal.draw(|f| super::ui::draw(f, self))?;
                last_frame = Some(Instant::now());
            }

            if event::poll(FRAME_INTERVAL)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('p') => {
                if self.is_paused() {
                    self.resume();
                } else {
                    self.pause();
                }
            }
            KeyCode::Char('r') => self.refresh_now(),
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char(']') => {
                self.set_interval(faster(self.interval));
            }
            KeyCode::Char('-') | KeyCode::Char('[') => {
                self.set_interval(slower(self.interval));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.log_scroll + 1 < self.view.logs.len() {
                    self.log_scroll += 1;
                }
            }
            KeyCode::Home | KeyCode::Char('g') => self.log_scroll = 0,
            _ => {}
        }
    }

    /// The tail can shrink under the cursor when a large batch ages out.
    fn clamp_log_scroll(&mut self) {
        self.log_scroll = self.log_scroll.min(self.view.logs.len().saturating_sub(1));
    }

    fn refresh_now(&self) {
        let _guard = self.runtime.enter();
        self.dashboard.dispatch_cycle();
    }

    fn resume(&mut self) {
        if self.handle.is_none() {
            self.handle = Some(self.dashboard.start(&mut self.scheduler, self.interval));
        }
    }

    fn pause(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.scheduler.stop(handle);
        }
    }

    fn set_interval(&mut self, interval: Duration) {
        if interval == self.interval {
            return;
        }
        self.interval = interval;
        if !self.is_paused() {
            self.pause();
            self.resume();
        }
    }

    // --- Public accessors for the renderer ---

    pub fn view(&self) -> &View {
        &self.view
    }
    pub fn metric_names(&self) -> &[String] {
        self.dashboard.metric_names()
    }
    pub fn stats(&self) -> CycleStats {
        self.stats
    }
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
    pub fn interval(&self) -> Duration {
        self.interval
    }
    pub fn is_paused(&self) -> bool {
        self.handle.is_none()
    }
    pub fn log_scroll(&self) -> usize {
        self.log_scroll
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
