pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod engine;
pub mod models;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Anything that stops the service from coming up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error(transparent)]
    Core(#[from] core_state::CoreError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

pub fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let cfg = config::AppConfig::from_env()?;
    tracing::info!(db_path = %cfg.db_path.display(), bind_addr = %cfg.bind_addr, "Configuration loaded");

    if cfg.seed_reference_data {
        let conn = db::open_database(&cfg.db_path)?;
        db::seed::seed_reference_data(&conn)?;
    }

    let core = Arc::new(core_state::CoreState::new(&cfg.db_path)?);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut server = api::start_api_server(core, cfg.bind_addr, &cfg.cors_origins).await?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for shutdown signal: {e}");
        }
        server.shutdown();
        server.stopped().await?;
        Ok::<(), StartupError>(())
    })
}
