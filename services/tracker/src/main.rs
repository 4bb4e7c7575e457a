use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod credentials;
mod error;
mod maps;
mod models;
mod registry;
mod repositories;
mod routes;
mod state;
mod validation;

use common::database::{DatabaseConfig, health_check, init_pool};

use crate::{
    config::{MapsConfig, TrackerConfig},
    maps::MapsClient,
    registry::UserRegistry,
    repositories::UserRepository,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting tracker service");

    let config = TrackerConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let user_repository = UserRepository::new(pool);
    user_repository.ensure_schema().await?;

    let users = user_repository.load_all().await?;
    let registry = UserRegistry::with_users(config.deviation_threshold_meters, users);

    let maps = MapsClient::new(MapsConfig::from_env()?)?;

    let app_state = AppState {
        config: config.clone(),
        registry: registry.clone(),
        user_repository: user_repository.clone(),
        maps,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Tracker service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush state that was not committed explicitly.
    let users = registry.snapshot().await;
    if let Err(e) = user_repository.save_all(&users).await {
        error!("Failed to save users on shutdown: {}", e);
    }

    info!("Shutting down tracker service");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
