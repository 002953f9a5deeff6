use crate::api::models::{ComponentHealth, ComponentStatus, HealthResponse, HealthStatus};
use axum::{extract::State, Json};
use chrono::Utc;
use super::AppState;

/// Liveness check
pub async fn ping() -> &'static str {
    "pong"
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = check_database_health(&state).await;

    let status = if database.status == ComponentStatus::Healthy {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn check_database_health(state: &AppState) -> ComponentHealth {
    match state.user_repo.count().await {
        Ok(users) => ComponentHealth {
            status: ComponentStatus::Healthy,
            message: Some("Database is operational".to_string()),
            details: Some(serde_json::json!({
                "status": "connected",
                "users": users,
            })),
        },
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            ComponentHealth {
                status: ComponentStatus::Unhealthy,
                message: Some("Database unavailable".to_string()),
                details: None,
            }
        }
    }
}
