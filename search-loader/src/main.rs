//! Search Loader Main Entry Point
//!
//! Loads the source collection into the search index once and exits. The exit
//! status is non-zero when configuration is invalid or the run fails.

use dotenv::dotenv;
use search_loader::{Dependencies, IndexingError, LoaderSettings};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "search_loader=info,search_loader_repository=info,search_loader_source=info",
        )
    });

    if env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "search-loader",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "search-loader",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting search loader");

    let settings = LoaderSettings::from_env()
        .inspect_err(|e| error!(error = %e, "Invalid configuration"))?;

    let mut deps = match Dependencies::new(settings).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match deps.orchestrator.run().await {
        Ok(summary) => {
            println!(
                "Loaded {} of {} documents into the index ({} skipped, {} rejected, {} of {} batches failed)",
                summary.pushed,
                summary.read,
                summary.skipped,
                summary.failed_documents,
                summary.failed_batches,
                summary.batches
            );
            info!("Search loader completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(
                error = %e,
                state = %deps.orchestrator.state(),
                "Search loader failed"
            );
            Err(e.into())
        }
    }
}
