//! CLI for metricscat — live metrics and log tail for a telemetry backend.

mod commands;
mod tui;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "metricscat")]
#[command(about = "metricscat — live metrics charts and log tail for a telemetry backend")]
#[command(version = metricscat_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal dashboard: metric charts above, log tail below
    Dashboard {
        #[command(flatten)]
        poll: PollArgs,
    },

    /// Print new log lines and latest metric values as plain text until Ctrl+C
    Tail {
        #[command(flatten)]
        poll: PollArgs,
    },

    /// Run a single poll cycle and print the merged state as JSON
    Snapshot {
        #[command(flatten)]
        poll: PollArgs,

        /// Write the JSON to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
}

/// Flags shared by every subcommand that talks to the backend.
#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Backend base URL (defaults to $METRICSCAT_API_URL, then http://localhost:8000/api)
    #[arg(long)]
    pub api: Option<String>,

    /// Milliseconds between poll cycles
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Previously displayed log lines kept when a new batch arrives
    #[arg(long, default_value = "25")]
    pub retention: usize,

    /// Comma-separated metric names to chart
    #[arg(long)]
    pub metrics: Option<String>,

    /// Look-back window: minute1, minute5, minute15, hour1, hour4, day
    #[arg(long)]
    pub window: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub timeout_ms: u64,
}

fn main() {
    let cli = Cli::parse();

    // Log output would scribble over the alternate screen; the dashboard shows
    // failures in its title bar instead.
    let default_filter = match cli.command {
        Commands::Dashboard { .. } => "off",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Dashboard { poll } => commands::dashboard::run(&poll),
        Commands::Tail { poll } => commands::tail::run(&poll),
        Commands::Snapshot { poll, output } => commands::snapshot::run(&poll, output.as_deref()),
    }
}
