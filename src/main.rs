use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bungalow::config::{LogFormat, StoreBackend};
use bungalow::{AppState, Config, MemoryStore, PgStore, server};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Json, "info");
            error!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };
    init_tracing(config.log_format, &config.log_level);

    info!("Starting bungalow v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

fn init_tracing(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match format {
        LogFormat::Json => builder.json().with_current_span(true).init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = config.port,
        store = %config.store_backend,
        database_url = %config.database_url_masked(),
        "Configuration loaded"
    );

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let store = PgStore::connect(&config).await.map_err(|e| {
                error!("Failed to connect to PostgreSQL: {e}");
                exitcode::UNAVAILABLE
            })?;
            AppState::new(Arc::new(store), config.clone())
        }
        StoreBackend::Memory => {
            info!("Using in-memory store");
            AppState::new(Arc::new(MemoryStore::new()), config.clone())
        }
    };

    let addr = config.server_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {addr}: {e}");
            state.store.close().await;
            return Err(exitcode::UNAVAILABLE);
        }
    };

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  POST   /person       - Create a person");
    info!("  GET    /person/{{id}}  - Get a person");
    info!("  DELETE /person/{{id}}  - Delete a person");
    info!("  GET    /health       - Dependency health");
    info!("  GET    /metrics      - Prometheus metrics");
    info!("  GET    /echo         - Echo the raw request");

    server::serve(listener, state, server::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })
}
