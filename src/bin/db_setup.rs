use financial_analyst_agents::{
    app::init_tracing,
    config::AppConfig,
    store::{CompanyStore, SqliteCompanyStore},
};
use tracing::info;

/// Create the company table and seed the starter companies
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info,sqlx=warn", true);

    let config = AppConfig::load()?;
    let store = SqliteCompanyStore::new(&config.db_file);

    let inserted = store.setup().await?;
    let total = store.all().await?.len();
    info!(inserted, total, "Database setup complete");

    println!(
        "{}: inserted {} starter companies ({} total)",
        store.path().display(),
        inserted,
        total
    );

    Ok(())
}
