use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::config::DatabaseConfig;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut options =
        PgConnectOptions::from_str(&config.url).context("Invalid database connection string")?;
    if let Some(name) = config.name.as_deref().filter(|n| !n.is_empty()) {
        options = options.database(name);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_with(options)
        .await
        .context("Failed to connect to PostgreSQL")?;

    tracing::info!("Database pool initialized");
    Ok(pool)
}
