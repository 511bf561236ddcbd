//! Liveness endpoint.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,

    /// Store reachability, `connected` when the probe succeeded
    pub store: String,

    pub checked_at: DateTime<Utc>,
}

/// `GET /health`
///
/// Pings the store. An unreachable store surfaces as the usual 500 error
/// envelope rather than a degraded body.
///
/// ```json
/// { "status": "healthy", "store": "connected", "checked_at": "2025-02-10T12:00:00Z" }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.probe.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        store: "connected".to_string(),
        checked_at: Utc::now(),
    }))
}
