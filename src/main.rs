use log::{error, info};
use std::env;
use std::process;
use uuid::Uuid;

use aquavida::config::AppConfig;
use aquavida::models::BillingPeriod;
use aquavida::services::{Clock, contracts, payments};
use aquavida::store::PgDocumentStore;

/// Scheduled maintenance: refreshes overdue charges and expired contracts,
/// and with `charges [MONTH YEAR]` generates the monthly charges.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _guard = sentry::init((
        env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));
    env_logger::init();
    let config = AppConfig::from_env();

    let Some(database_url) = config.database_url.clone() else {
        error!("DATABASE_URL must be set");
        process::exit(1);
    };
    let store = match PgDocumentStore::connect(&database_url).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open the document store: {}", e);
            process::exit(1);
        }
    };

    let clock = Clock::system();
    let args: Vec<String> = env::args().skip(1).collect();

    if let Err(e) = run(&store, clock, &config, &args).await {
        error!("Maintenance run failed: {}", e);
        sentry::capture_error(&e);
        process::exit(1);
    }
}

async fn run(store: &PgDocumentStore, clock: Clock, config: &AppConfig, args: &[String]) -> aquavida::AppResult<()> {
    let charges = match args.first().map(String::as_str) {
        Some("charges") => Some(BillingPeriod::from_args(
            args.get(1).map(String::as_str),
            args.get(2).map(String::as_str),
            clock.today(),
        )?),
        _ => None,
    };

    let refreshed = payments::refresh_overdue(store, clock, config).await?;
    let expired = contracts::refresh_expired(store, clock).await?;
    info!("{} payments refreshed, {} contracts expired", refreshed, expired);

    if let Some(period) = charges {
        let summary = payments::generate_monthly_charges(store, clock, config, period, Uuid::nil()).await?;
        info!("{} charges created for {:02}/{}", summary.created.len(), period.month, period.year);
    }

    for contract in contracts::expiring_soon(store, clock, config).await? {
        info!(
            "Contract {} ends on {}",
            contract.number,
            contract.end_date.map(|d| d.to_string()).unwrap_or_default()
        );
    }
    Ok(())
}
