//! REST API module
//!
//! This module provides the HTTP server and REST API endpoints including:
//! - API routing and request handling
//! - Account and administration handlers
//! - Trace ID and security header middleware
//! - Request/response models

pub mod server;
pub mod routes;
pub mod middleware;
pub mod handlers;
pub mod models;

pub use server::ApiServer;
pub use handlers::AppState;
pub use models::{ErrorResponse, ValidatedJson};
pub use middleware::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
