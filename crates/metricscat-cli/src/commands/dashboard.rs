use crate::PollArgs;

pub fn run(args: &PollArgs) {
    let config = super::config_or_exit(args);
    log::info!("dashboard polling {} every {:?}", config.base_url(), config.interval);

    let mut app = match crate::tui::app::App::new(config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
