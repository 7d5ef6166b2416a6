use financial_analyst_agents::{
    app::{init_tracing, App},
    cli::Repl,
    config::AppConfig,
};
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs on stderr; stdout carries the conversation
    init_tracing("info,sqlx=warn", true);

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let app = match App::build(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match app.store.setup().await {
        Ok(inserted) => info!(inserted, db = %config.db_file.display(), "Company store ready"),
        Err(e) => {
            error!("Company store setup failed: {}", e);
            eprintln!("Company store setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    }

    info!(session = %config.session, "Financial analyst assistant starting");

    let repl = Repl::new(app.coordinator, config.session_id());
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    match repl.run(stdin, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Terminal loop failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
