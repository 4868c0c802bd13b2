//! Synthetic Data Seeder
//!
//! Generates synthetic days and inserts them into the source collection so the
//! search loader has something to load.

use std::env;
use std::time::Duration;

use dotenv::dotenv;
use search_loader_source::mongo::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_TIMEOUT};
use search_loader_source::{MongoConfig, MongoStore};
use synthetic_data::{generate, persist, SeedError, DEFAULT_DAY_COUNT};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("seed=info,synthetic_data=info,search_loader_source=info"));

    if env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }
}

/// Read the store location and day count from the environment.
///
/// # Environment Variables
///
/// - `MONGO_CONN_STRING` (or `COSMOS_CONN_STRING`): connection string (required)
/// - `SOURCE_DATABASE`: database name (default: Synthetic_Data_DB)
/// - `SOURCE_COLLECTION`: collection name (default: Synthetic_Data_COL)
/// - `SOURCE_TIMEOUT_SECS`: server selection timeout (default: 10)
/// - `SYNTHETIC_DAY_COUNT`: number of days, overridden by the first argument (default: 5000)
fn load_config() -> Result<(MongoConfig, usize), SeedError> {
    let conn = env::var("MONGO_CONN_STRING")
        .or_else(|_| env::var("COSMOS_CONN_STRING"))
        .map_err(|_| SeedError::config("Missing required environment variable: MONGO_CONN_STRING"))?;

    let database = env::var("SOURCE_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
    let collection =
        env::var("SOURCE_COLLECTION").unwrap_or_else(|_| DEFAULT_COLLECTION.to_string());
    let timeout = env::var("SOURCE_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    let count = match env::args().nth(1).or_else(|| env::var("SYNTHETIC_DAY_COUNT").ok()) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|e| SeedError::config(format!("Invalid day count {:?}: {}", raw, e)))?,
        None => DEFAULT_DAY_COUNT,
    };

    let config = MongoConfig::new(conn)
        .with_namespace(database, collection)
        .with_timeout(timeout);
    Ok((config, count))
}

#[tokio::main]
async fn main() -> Result<(), SeedError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    let (config, count) = load_config().inspect_err(|e| error!(error = %e, "Invalid configuration"))?;

    info!(
        database = %config.database,
        collection = %config.collection,
        count = count,
        "Seeding synthetic data"
    );

    let store = MongoStore::connect(&config)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to connect to document store"))?;

    let days = generate(count);
    let inserted = persist(&store, &days).await?;

    info!(inserted = inserted, "Seeding completed successfully");
    Ok(())
}
