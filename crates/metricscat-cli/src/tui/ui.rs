//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────────────┐
//! │  metricscat  http://localhost:8000/api  #42  1000ms  │
//! ├──────────────────────────┬───────────────────────────┤
//! │ system.cpu.utilization   │ system.mem.used           │
//! │   ⣀⡠⠔⠊⠉⠉⠑⠢⣀             │   ⠉⠉⠒⠤⣀⣀⡠⠤⠒             │
//! │                          │                           │
//! ├──────────────────────────┴───────────────────────────┤
//! │ 1042  2024-03-01 10:00:07  INFO  worker started      │
//! │ 1041  2024-03-01 10:00:06  WARN  slow response       │
//! │ ...                                                  │
//! ├──────────────────────────────────────────────────────┤
//! │  q quit  p pause  +/- interval  ↑↓ scroll  r refresh │
//! └──────────────────────────────────────────────────────┘

use super::app::App;
use metricscat_core::{LogLevel, MetricPoint};
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // title
            Constraint::Percentage(45), // charts
            Constraint::Min(5),         // logs
            Constraint::Length(1),      // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    draw_charts(f, rows[1], app);
    draw_logs(f, rows[2], app);
    draw_keys(f, rows[3]);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();
    let state = if app.is_paused() {
        Span::styled("  PAUSED ", Style::default().bold().fg(Color::Yellow))
    } else {
        Span::raw("")
    };
    let failures = if stats.failed > 0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" metricscat ", Style::default().bold().fg(Color::Cyan)),
            Span::raw(format!(" {} ", app.api_url())),
            Span::styled(
                format!(
                    " #{}  {}ms  ok {} ",
                    stats.cycles,
                    app.interval().as_millis(),
                    stats.applied
                ),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(format!(" failed {} ", stats.failed), failures),
            state,
        ]));

    f.render_widget(block, area);
}

fn draw_charts(f: &mut Frame, area: Rect, app: &App) {
    let names = app.metric_names();
    if names.is_empty() {
        return;
    }

    let constraints: Vec<Constraint> = names
        .iter()
        .map(|_| Constraint::Ratio(1, names.len() as u32))
        .collect();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (name, col) in names.iter().zip(cols.iter()) {
        let series = app
            .view()
            .metrics
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        draw_chart(f, *col, name, series);
    }
}

fn draw_chart(f: &mut Frame, area: Rect, name: &str, series: &[MetricPoint]) {
    let Some(last) = series.last() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {name} "));
        let p = Paragraph::new("waiting for data")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let data = chart_points(series);
    let x_max = data.last().map(|&(x, _)| x).unwrap_or(0.0).max(1.0);
    let (y_min, y_max) = y_bounds(series);
    let latest = format_value(name, last.value);

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&data),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {name}  {latest} ")),
        )
        .x_axis(Axis::default().bounds([0.0, x_max]).labels(vec![
            Line::from("0s"),
            Line::from(format!("{x_max:.0}s")),
        ]))
        .y_axis(Axis::default().bounds([y_min, y_max]).labels(vec![
            Line::from(format_value(name, y_min)),
            Line::from(format_value(name, y_max)),
        ]));

    f.render_widget(chart, area);
}

fn draw_logs(f: &mut Frame, area: Rect, app: &App) {
    let logs = &app.view().logs;

    let rows: Vec<Row> = logs
        .iter()
        .skip(app.log_scroll())
        .map(|line| {
            let (label, style) = match line.level {
                Some(level) => (level.label(), level_style(level)),
                None => ("", Style::default()),
            };
            Row::new(vec![
                Cell::from(line.offset.to_string()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(line.recorded_at.clone()),
                Cell::from(label).style(style),
                Cell::from(line.line.clone()),
            ])
        })
        .collect();

    let title = if app.log_scroll() > 0 {
        format!(" Logs ({}, scrolled {}) ", logs.len(), app.log_scroll())
    } else {
        format!(" Logs ({}) ", logs.len())
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),  // offset
            Constraint::Length(20), // recorded at
            Constraint::Length(6),  // level
            Constraint::Min(10),    // line
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(table, area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(
        " q quit   p pause/resume   +/- interval   ↑↓ scroll logs   r refresh now",
    )
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Chart data with x as seconds since the first point of the window.
fn chart_points(series: &[MetricPoint]) -> Vec<(f64, f64)> {
    let Some(first) = series.first() else {
        return Vec::new();
    };
    series
        .iter()
        .map(|p| (p.timestamp - first.timestamp, p.value))
        .collect()
}

/// Y-axis bounds padded by 10% so a flat series still gets a visible band.
fn y_bounds(series: &[MetricPoint]) -> (f64, f64) {
    let min = series.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
    let max = series
        .iter()
        .map(|p| p.value)
        .fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.1).max(max.abs() * 0.01).max(0.5);
    let low = if min >= 0.0 { (min - pad).max(0.0) } else { min - pad };
    (low, max + pad)
}

/// Memory series are byte counts; everything else is shown as a plain number.
fn format_value(name: &str, value: f64) -> String {
    if !name.starts_with("system.mem.") {
        return format!("{value:.2}");
    }
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut scaled = value;
    let mut unit = 0;
    while scaled.abs() >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }
    format!("{scaled:.1} {}", UNITS[unit])
}

fn level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Debug => Style::default().fg(Color::DarkGray),
        LogLevel::Notice | LogLevel::Info => Style::default().fg(Color::Green),
        LogLevel::Warning => Style::default().fg(Color::Yellow),
        LogLevel::Error => Style::default().fg(Color::Red),
        LogLevel::Fatal => Style::default().fg(Color::Red).bold(),
    }
}
