use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "content-processor";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    if let Err(e) = state.store.ping().await {
        tracing::error!("Health check failed: {e:#}");
        return Err(AppError::ServiceUnavailable("Service unhealthy".to_string()));
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: "connected".to_string(),
    }))
}
