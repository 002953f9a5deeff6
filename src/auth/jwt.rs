//! Session token issuance and validation
//!
//! Tokens are HS256-signed JWTs. The signing secret is injected at
//! construction; nothing here reads global configuration.

use crate::core::error::{Result, UserManageError};
use crate::db::models::Role;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message used for every token rejection
pub const INVALID_SESSION: &str = "Invalid or expired session";

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Lifetime of newly issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate a token for the given identity
    pub fn issue(&self, id: &str, username: &str, role: Role) -> Result<String> {
        let now = chrono::Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| UserManageError::TokenError(format!("Invalid session lifetime: {}", e)))?;
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| UserManageError::TokenError("Failed to calculate expiration".to_string()))?;

        let claims = Claims {
            id: id.to_string(),
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| UserManageError::TokenError(format!("Failed to generate token: {}", e)))
    }

    /// Validate a token and extract its claims
    ///
    /// Every rejection reason yields the same client-facing error; the cause
    /// is only logged.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token rejected");
                UserManageError::AuthenticationError(INVALID_SESSION.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn service() -> JwtService {
        JwtService::new(SECRET, Duration::from_secs(1800))
    }

    fn sign(claims: &Claims, algorithm: Algorithm, secret: &str) -> String {
        encode(
            &Header::new(algorithm),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims_expiring_in(seconds: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            id: "u1".to_string(),
            username: "alice".to_string(),
            role: Role::User,
            iat: now - 10,
            exp: now + seconds,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let jwt = service();
        let token = jwt.issue("u1", "alice", Role::Admin).unwrap();
        let claims = jwt.verify(&token).unwrap();

        assert_eq!(claims.id, "u1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign(&claims_expiring_in(-5), Algorithm::HS256, SECRET);
        let err = service().verify(&token).unwrap_err();
        assert!(matches!(err, UserManageError::AuthenticationError(_)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign(&claims_expiring_in(600), Algorithm::HS256, "other-secret");
        assert!(service().verify(&token).is_err());
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let token = sign(&claims_expiring_in(600), Algorithm::HS512, SECRET);
        assert!(service().verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected_with_same_message() {
        let jwt = service();
        let expired = sign(&claims_expiring_in(-5), Algorithm::HS256, SECRET);

        let a = jwt.verify("not.a.token").unwrap_err().to_string();
        let b = jwt.verify(&expired).unwrap_err().to_string();
        assert_eq!(a, b);
    }
}
