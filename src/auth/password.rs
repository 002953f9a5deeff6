//! Password hashing and verification using bcrypt

use crate::core::error::{Result, UserManageError};
use tokio::task;

/// Hash a password using bcrypt with the given work factor
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost)
        .map_err(|e| UserManageError::PasswordHashError(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored hash
///
/// A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            false
        }
    }
}

/// [`hash_password`] on the blocking thread pool
pub async fn hash_password_async(password: String, cost: u32) -> Result<String> {
    task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| UserManageError::TaskError(format!("Password hashing task failed: {}", e)))?
}

/// [`verify_password`] on the blocking thread pool
pub async fn verify_password_async(password: String, hash: String) -> Result<bool> {
    task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| UserManageError::TaskError(format!("Password verification task failed: {}", e)))
}
