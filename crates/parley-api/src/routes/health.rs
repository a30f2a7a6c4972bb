use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Returns the health status of the API and its dependencies
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut services = HashMap::new();
    let mut healthy = true;

    let store = match state.persist.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            healthy = false;
            "disconnected"
        }
    };
    services.insert("store".to_string(), store.to_string());

    let cache = match state.cache.health().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Cache health check failed");
            healthy = false;
            "disconnected"
        }
    };
    services.insert(
        format!("cache:{}", state.cache.store().name()),
        cache.to_string(),
    );

    let search = match state.search.health().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Search health check failed");
            healthy = false;
            "disconnected"
        }
    };
    services.insert(format!("search:{}", state.search.backend()), search.to_string());

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}
