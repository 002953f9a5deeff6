//! User management backend
//!
//! REST service for account self-service and role-gated administration.

use user_manage::{api, auth, core, db};

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles .env, CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Configuration loaded successfully");
    info!("Starting user-manage v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );
    info!(
        location = ?config.database.location(),
        pool_size = config.database.connection_pool_size,
        "Database configuration"
    );

    info!("Initializing database...");
    let db = Arc::new(db::DatabaseManager::from_config(&config.database)?);
    info!("Database initialized successfully");

    let user_repo = db::UserRepository::new(db.clone());
    auth::ensure_admin_user(&user_repo, &config.security).await?;

    info!("Initializing HTTP server...");
    let server_url = format!("http://{}:{}", config.server.host, config.server.port);
    let server = api::ApiServer::new(&config, db)?;

    info!(url = %server_url, "Server ready - starting to serve requests");

    server.serve().await?;

    Ok(())
}
