//! Customers Service - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the ledger client and notifier
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

use std::{sync::Arc, time::Duration};

use customers_service::{
    config::Config,
    db,
    middleware::auth::TokenIssuer,
    repositories::postgres::PgStore,
    routes,
    services::{
        ledger_client::HttpLedgerClient,
        notification_service::{LogNotifier, Notifier, WebhookNotifier},
    },
    state::AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let ledger = HttpLedgerClient::new(
        &config.ledger_base_url,
        Duration::from_secs(config.ledger_timeout_secs),
    )?;

    let notifier: Arc<dyn Notifier> = match &config.notification_url {
        Some(url) => {
            tracing::info!(url = %url, "Notifications will be delivered by webhook");
            Arc::new(WebhookNotifier::new(url, config.notification_secret.clone())?)
        }
        None => {
            tracing::info!("NOTIFICATION_URL not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let tokens = TokenIssuer::new(
        config.token_secret.clone(),
        config.token_ttl(),
    );

    let state = AppState::new(PgStore::new(pool), Arc::new(ledger), notifier, tokens);
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
