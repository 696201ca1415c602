pub mod api;
pub mod appointment;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod sync;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Startup failed: {0}")]
    Core(#[from] core_state::CoreError),
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load configuration, open the database and serve the API until Ctrl-C.
pub async fn run() -> Result<(), RunError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::ServerConfig::from_env()?;
    let core = Arc::new(core_state::CoreState::initialize(config.db_path.clone())?);

    let server = api::start_api_server_on(core, config.bind_addr).await?;
    tracing::info!(
        addr = %server.session.server_addr,
        db = %config.db_path.display(),
        "Listening"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received, shutting down");
    server.shutdown().await;
    Ok(())
}
