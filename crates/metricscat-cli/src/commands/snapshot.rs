use metricscat_core::{Dashboard, DashboardSnapshot, HttpBackend};

use crate::PollArgs;

pub fn run(args: &PollArgs, output_path: Option<&str>) {
    let config = super::config_or_exit(args);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let dashboard = Dashboard::new(HttpBackend::new(&config), &config);
    runtime.block_on(dashboard.run_cycle());
    let snapshot = dashboard.snapshot();

    if snapshot.stats.failed > 0 {
        eprintln!(
            "warning: {} of {} fetches failed; see RUST_LOG=warn output",
            snapshot.stats.failed,
            snapshot.stats.failed + snapshot.stats.applied
        );
    }

    let json = match to_json(&snapshot) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to encode snapshot: {e}");
            std::process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, json + "\n") {
                eprintln!("Failed to write {path}: {e}");
                std::process::exit(1);
            }
            println!("Snapshot written to {path}");
        }
        None => println!("{json}"),
    }
}

fn to_json(snapshot: &DashboardSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}
