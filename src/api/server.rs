//! HTTP Server implementation
//!
//! This module provides the HTTP server using Axum framework with:
//! - Configurable host/port binding
//! - Graceful shutdown handling
//! - Request timeouts
//! - Security headers and per-request trace IDs
//! - CORS support

use crate::api::handlers::AppState;
use crate::api::middleware::{
    security_headers_middleware, trace_id_middleware, SecurityHeadersConfig,
};
use crate::api::routes::build_api_routes;
use crate::core::config::ServerConfig;
use crate::core::error::Result;
use crate::core::Config;
use crate::db::manager::DatabaseManager;
use axum::{
    http::{header, Method},
    middleware,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
}

impl ApiServer {
    /// Create a new API server over an opened credential store
    pub fn new(config: &Config, db: Arc<DatabaseManager>) -> Result<Self> {
        let state = AppState::new(db, &config.security)?;
        Ok(Self {
            router: Self::build_router(config, state),
            config: config.server.clone(),
        })
    }

    /// Build the Axum router with all routes and middleware
    fn build_router(config: &Config, state: AppState) -> Router {
        let security_headers = SecurityHeadersConfig::from(&config.security);

        build_api_routes(state).layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    security_headers,
                    security_headers_middleware,
                ))
                .layer(middleware::from_fn(trace_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(Self::build_cors_layer(&config.security.allowed_origins))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout,
                ))),
        )
    }

    /// Build CORS layer from allowed origins configuration
    ///
    /// Credentials (the session cookie) are only allowed for an explicit
    /// origin list; browsers refuse them together with a wildcard.
    fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
        let cors = CorsLayer::new();

        if allowed_origins.iter().any(|origin| origin == "*") {
            cors.allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            cors.allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(true)
        }
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            request_timeout = self.config.request_timeout,
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;

        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");

        Ok(())
    }

    /// Get a reference to the router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::TRACE_ID_HEADER;
    use crate::core::config::{DatabaseConfig, LoggingConfig, SecurityConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn config(allowed_origins: Vec<String>) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                request_timeout: 30,
            },
            database: DatabaseConfig {
                url: ":memory:".to_string(),
                connection_pool_size: 1,
                busy_timeout: 1000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                output: "stdout".to_string(),
                log_file: None,
                max_file_size: 1024,
                max_backups: 1,
            },
            security: SecurityConfig {
                jwt_secret: "server-secret".to_string(),
                session_ttl: 1800,
                bcrypt_cost: 4,
                allowed_origins,
                enable_hsts: true,
                hsts_max_age: 3600,
                admin_username: None,
                admin_password: None,
            },
        }
    }

    fn server(allowed_origins: Vec<String>) -> ApiServer {
        let config = config(allowed_origins);
        let db = Arc::new(DatabaseManager::from_config(&config.database).unwrap());
        ApiServer::new(&config, db).unwrap()
    }

    #[tokio::test]
    async fn test_router_applies_global_layers() {
        let router = server(vec!["*".to_string()]).router().clone();

        let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(TRACE_ID_HEADER));
        assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
        assert!(response.headers().contains_key("Strict-Transport-Security"));
    }

    #[tokio::test]
    async fn test_explicit_origins_allow_credentials() {
        let router = server(vec!["https://app.example.com".to_string()]).router().clone();

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/login")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let router = server(vec!["*".to_string()]).router().clone();

        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
