pub mod admin;
pub mod system;
pub mod users;

pub use admin::*;
pub use system::*;
pub use users::*;

use crate::auth::jwt::JwtService;
use crate::auth::password::hash_password;
use crate::core::config::SecurityConfig;
use crate::core::error::Result;
use crate::db::repository::UserRepository;
use crate::db::DatabaseManager;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub user_repo: Arc<UserRepository>,
    pub jwt: Arc<JwtService>,
    pub bcrypt_cost: u32,
    /// Hash of a random password at `bcrypt_cost`, verified against when a
    /// login names an unknown account
    pub dummy_hash: Arc<String>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseManager>, security: &SecurityConfig) -> Result<Self> {
        let jwt = JwtService::new(&security.jwt_secret, security.session_ttl());
        Self::with_jwt(db, jwt, security.bcrypt_cost)
    }

    /// Build state around an existing token service
    pub fn with_jwt(db: Arc<DatabaseManager>, jwt: JwtService, bcrypt_cost: u32) -> Result<Self> {
        let dummy_hash = hash_password(&Uuid::new_v4().to_string(), bcrypt_cost)?;

        Ok(Self {
            user_repo: Arc::new(UserRepository::new(db)),
            jwt: Arc::new(jwt),
            bcrypt_cost,
            dummy_hash: Arc::new(dummy_hash),
        })
    }
}
