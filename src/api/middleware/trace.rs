use crate::core::error::scope_trace_id;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// HTTP header name for trace ID
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Middleware that gives every request a trace ID
///
/// The ID is recorded on the `http_request` span, stored in the request
/// extensions as [`TraceId`] and echoed in the `X-Trace-Id` response header.
/// Error bodies produced while handling the request carry the same ID.
pub async fn trace_id_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = Uuid::new_v4().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %request.method(),
        uri = %request.uri().path(),
    );

    request.extensions_mut().insert(TraceId(trace_id.clone()));

    let mut response = scope_trace_id(
        trace_id.clone(),
        async move {
            tracing::info!("Request started");
            let response = next.run(request).await;
            tracing::info!(status = %response.status(), "Request completed");
            response
        }
        .instrument(span),
    )
    .await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }

    response
}

/// Extension type for storing trace ID in request extensions
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ErrorResponse, UserManageError};
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Extension, Router};
    use tower::util::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/test",
                get(|Extension(trace_id): Extension<TraceId>| async move {
                    (StatusCode::OK, trace_id.as_str().to_string())
                }),
            )
            .layer(middleware::from_fn(trace_id_middleware))
    }

    async fn call() -> (String, String) {
        let request = axum::http::Request::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        let header = response
            .headers()
            .get(TRACE_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_trace_id_header_matches_extension() {
        let (header, body) = call().await;
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(header, body);
    }

    #[tokio::test]
    async fn test_error_body_carries_header_trace_id() {
        let app = Router::new()
            .route(
                "/fail",
                get(|| async { Err::<(), _>(UserManageError::NotFound("missing".into())) }),
            )
            .layer(middleware::from_fn(trace_id_middleware));
        let request = axum::http::Request::builder()
            .uri("/fail")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let header = response
            .headers()
            .get(TRACE_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.trace_id, header);
    }

    #[tokio::test]
    async fn test_trace_id_unique_per_request() {
        let (first, _) = call().await;
        let (second, _) = call().await;
        assert_ne!(first, second);
    }
}
