use financial_analyst_agents::{
    api::{start_server, ApiState},
    app::{init_tracing, App},
    config::AppConfig,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info,tower_http=debug,sqlx=warn", false);

    let config = AppConfig::load()?;

    info!("Financial Analyst Agents - API Server");
    info!("Port: {}", config.api_port);

    let app = App::build(&config)?;
    let inserted = app.store.setup().await?;
    info!(inserted, "Company store ready");

    let state = ApiState {
        coordinator: app.coordinator,
        resolver: app.resolver,
        default_session: config.session.clone(),
    };

    info!("Starting API server...");
    start_server(state, config.api_port).await?;

    Ok(())
}
