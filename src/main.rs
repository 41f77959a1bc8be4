use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use content_processor::config::AppConfig;
use content_processor::db::{
    DocumentRepository, DocumentStore, MemoryDocumentStore, connection, migrations,
};
use content_processor::logging;
use content_processor::routes;
use content_processor::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine; real environment variables still apply
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init(&config)?;
    tracing::info!(
        "Configuration loaded (env: {})",
        std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into())
    );

    let mut pool: Option<PgPool> = None;
    let store: Arc<dyn DocumentStore> = if config.testing {
        tracing::warn!("TESTING is set, using the in-memory document store");
        Arc::new(MemoryDocumentStore::new())
    } else {
        let db_pool = connection::create_pool(&config.database)
            .await
            .context("Failed to create database pool")?;
        migrations::run_all(&db_pool)
            .await
            .context("Failed to run migrations")?;
        pool = Some(db_pool.clone());
        Arc::new(DocumentRepository::new(db_pool))
    };

    store.ping().await.context("Database is not reachable")?;
    tracing::info!("Connected to document store");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = routes::router(AppState::new(config, store));

    tracing::info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connection closed");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
