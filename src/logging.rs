use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, LogFormat};

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(config: &AppConfig) -> String {
    let level = match config.logging.level.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    };
    if config.server.debug {
        format!("{level},tower_http=debug")
    } else {
        level
    }
}

pub fn init(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(config)))
        .context("Failed to create log filter")?;

    let format = config.logging.log_format();
    let registry = tracing_subscriber::registry().with(filter);
    match format.unwrap_or(LogFormat::Pretty) {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    if format.is_none() {
        tracing::warn!(
            "Unknown LOG_FORMAT {:?}, using pretty output",
            config.logging.format
        );
    }
    Ok(())
}
