//! Authentication request/response models

use crate::api::models::{require_non_empty, Validate};
use crate::core::error::Result;
use crate::db::models::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Login request
///
/// The capitalised keys are what the original web client sends.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(alias = "Password")]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<()> {
        require_non_empty("username", &self.username)?;
        require_non_empty("password", &self.password)
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity carried by the current session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub username: String,
    pub role: Role,
}
