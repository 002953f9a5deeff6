use serde::Serialize;

// Health API models

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: HealthStatus,
    /// Crate version of the running binary
    pub version: String,
    /// Credential store status
    pub database: ComponentHealth,
    /// Timestamp of the health check
    pub timestamp: String,
}

/// Overall health status
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health status of a single component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Component status
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}
