use crate::core::error::{Result, UserManageError};
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

/// Field-level checks run after a request body has been parsed
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// JSON body extractor that reports malformed bodies and failed checks as 400
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = UserManageError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| UserManageError::InvalidRequest(rejection.body_text()))?;

        value.validate()?;
        Ok(Self(value))
    }
}

/// Reject a required text field that is empty or whitespace
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(UserManageError::ValidationError(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Plain acknowledgement body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{header, StatusCode}, response::IntoResponse};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Named {
        name: String,
    }

    impl Validate for Named {
        fn validate(&self) -> Result<()> {
            require_non_empty("name", &self.name)
        }
    }

    fn json_request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn extract(body: &str) -> std::result::Result<Named, StatusCode> {
        ValidatedJson::<Named>::from_request(json_request(body), &())
            .await
            .map(|ValidatedJson(v)| v)
            .map_err(|e| e.into_response().status())
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        assert_eq!(extract(r#"{"name":"alice"}"#).await.ok().map(|n| n.name), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_and_invalid_bodies_are_bad_request() {
        assert_eq!(extract("{not json").await.err(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(extract(r#"{"other":1}"#).await.err(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(extract(r#"{"name":"  "}"#).await.err(), Some(StatusCode::BAD_REQUEST));
    }
}
