//! Error type system for the user management backend
//!
//! This module provides:
//! - One error enum shared by the store, auth and API layers
//! - HTTP status code mapping
//! - JSON error bodies carrying a trace ID
//! - Redaction of internal detail from 5xx responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use uuid::Uuid;

tokio::task_local! {
    static REQUEST_TRACE_ID: String;
}

/// Run `f` with `trace_id` as the trace ID of any error response built inside it
pub async fn scope_trace_id<F: Future>(trace_id: String, f: F) -> F::Output {
    REQUEST_TRACE_ID.scope(trace_id, f).await
}

/// Trace ID of the request being handled, if any
pub fn current_trace_id() -> Option<String> {
    REQUEST_TRACE_ID.try_with(|id| id.clone()).ok()
}

/// Main error type for the user management system
#[derive(Debug, thiserror::Error)]
pub enum UserManageError {
    // System-level errors
    #[error("System initialization failed: {0}")]
    InitializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Credential errors
    #[error("Password hashing failed: {0}")]
    PasswordHashError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Task error: {0}")]
    TaskError(String),
}

impl UserManageError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            UserManageError::InvalidRequest(_) | UserManageError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }

            UserManageError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,

            UserManageError::PermissionDenied(_) => StatusCode::FORBIDDEN,

            UserManageError::NotFound(_) => StatusCode::NOT_FOUND,

            UserManageError::Conflict(_) => StatusCode::CONFLICT,

            UserManageError::InitializationError(_)
            | UserManageError::DatabaseError(_)
            | UserManageError::PoolError(_)
            | UserManageError::PasswordHashError(_)
            | UserManageError::TokenError(_)
            | UserManageError::TaskError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            UserManageError::InitializationError(_) => "InitializationError",
            UserManageError::DatabaseError(_) => "DatabaseError",
            UserManageError::PoolError(_) => "PoolError",
            UserManageError::InvalidRequest(_) => "InvalidRequest",
            UserManageError::ValidationError(_) => "ValidationError",
            UserManageError::AuthenticationError(_) => "AuthenticationError",
            UserManageError::PermissionDenied(_) => "PermissionDenied",
            UserManageError::NotFound(_) => "NotFound",
            UserManageError::Conflict(_) => "Conflict",
            UserManageError::PasswordHashError(_) => "PasswordHashError",
            UserManageError::TokenError(_) => "TokenError",
            UserManageError::TaskError(_) => "TaskError",
        }
    }

    /// Whether the failure was caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check for a UNIQUE constraint violation coming from the store
    pub fn is_unique_violation(&self) -> bool {
        match self {
            UserManageError::DatabaseError(rusqlite::Error::SqliteFailure(err, _)) => {
                err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            }
            _ => false,
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Trace ID of the request that failed
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create a new error response with a specific trace ID
    pub fn with_trace_id(error: String, message: String, trace_id: String) -> Self {
        Self {
            error,
            message,
            trace_id,
        }
    }

    /// Create an error response from a UserManageError
    ///
    /// Server-side failures get a generic message so store or hashing
    /// detail never reaches the client.
    pub fn from_error(error: &UserManageError) -> Self {
        Self::from_error_with_trace_id(error, Uuid::new_v4().to_string())
    }

    /// Create an error response from a UserManageError with a specific trace ID
    pub fn from_error_with_trace_id(error: &UserManageError, trace_id: String) -> Self {
        if error.is_client_error() {
            Self::with_trace_id(error.error_type().to_string(), error.to_string(), trace_id)
        } else {
            Self::with_trace_id(
                "InternalError".to_string(),
                "Internal server error".to_string(),
                trace_id,
            )
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (trace_id: {})",
            self.error, self.message, self.trace_id
        )
    }
}

impl IntoResponse for UserManageError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = match current_trace_id() {
            Some(trace_id) => ErrorResponse::from_error_with_trace_id(&self, trace_id),
            None => ErrorResponse::from_error(&self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with UserManageError
pub type Result<T> = std::result::Result<T, UserManageError>;

/// Context extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context to an error using a closure
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let context_str = context.into();
            UserManageError::InitializationError(format!("{}: {}", context_str, e))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context_str = f();
            UserManageError::InitializationError(format!("{}: {}", context_str, e))
        })
    }
}
