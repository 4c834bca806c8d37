//! Server binary for the Gather events service.
//!
//! # Startup Sequence
//!
//! 1. Load a `.env` file, if present
//! 2. Load configuration from `gather-config.yaml` (or the path in
//!    `GATHER_CONFIG`), with environment overrides
//! 3. Initialize structured logging (tracing)
//! 4. Open the store: `PostgreSQL` with migrations, or in-memory when
//!    `database.url` is `memory`
//! 5. Serve the HTTP API until the process is terminated

mod error;

use std::path::Path;
use std::sync::Arc;

use gather_api::{AppState, JwtVerifier, start_server};
use gather_core::config::LoggingSection;
use gather_core::{GatherConfig, MemoryStore};
use gather_db::{PgStore, PostgresConfig, PostgresPool};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Config file used when `GATHER_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "gather-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal outside local development.
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("GATHER_CONFIG").unwrap_or_else(|_| String::from(DEFAULT_CONFIG_PATH));
    let config = GatherConfig::load(Path::new(&config_path))?;

    init_logging(&config.logging);
    info!(
        config_path = %config_path,
        host = %config.server.host,
        port = config.server.port,
        page_size = config.discovery.page_size,
        featured_limit = config.discovery.featured_limit,
        "gather-server starting"
    );

    run(config).await?;
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingSection) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Open storage, build the application state and serve.
async fn run(config: GatherConfig) -> Result<(), StartupError> {
    let verifier = JwtVerifier::from_section(&config.auth);
    if verifier.is_none() {
        warn!("JWT secret not configured, every request is anonymous");
    }

    let state = if config.database.is_memory() {
        warn!("Using the in-memory store, data is lost on restart");
        AppState::new(Arc::new(MemoryStore::new()), config.discovery.clone())
    } else {
        let pool = PostgresPool::connect(&PostgresConfig::from_section(&config.database)).await?;
        if config.database.run_migrations {
            pool.run_migrations().await?;
        }
        AppState::new(Arc::new(PgStore::new(pool)), config.discovery.clone())
    };

    start_server(&config.server, Arc::new(state.with_auth(verifier))).await?;
    Ok(())
}
