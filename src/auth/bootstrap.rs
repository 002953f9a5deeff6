//! Initial administrator account

use crate::auth::password::hash_password_async;
use crate::core::config::SecurityConfig;
use crate::core::error::Result;
use crate::db::models::{Role, User};
use crate::db::repository::UserRepository;
use tracing::info;
use uuid::Uuid;

/// Create the configured admin account unless its username is already taken
///
/// Returns whether an account was created. An existing account with that
/// username is left untouched, whatever its role.
pub async fn ensure_admin_user(user_repo: &UserRepository, security: &SecurityConfig) -> Result<bool> {
    let (username, password) = match (&security.admin_username, &security.admin_password) {
        (Some(username), Some(password)) => (username, password),
        _ => return Ok(false),
    };

    if user_repo.find_by_username(username).await?.is_some() {
        info!(username = %username, "Bootstrap admin already exists");
        return Ok(false);
    }

    let admin = User {
        id: Uuid::new_v4().to_string(),
        username: username.clone(),
        password_hash: hash_password_async(password.clone(), security.bcrypt_cost).await?,
        first_name: "Admin".to_string(),
        last_name: "User".to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    user_repo.create_with_role(&admin, Role::Admin).await?;
    info!(user_id = %admin.id, username = %admin.username, "Bootstrap admin created");

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseManager;
    use std::sync::Arc;

    fn security(admin: Option<(&str, &str)>) -> SecurityConfig {
        SecurityConfig {
            jwt_secret: "secret".to_string(),
            session_ttl: 1800,
            bcrypt_cost: 4,
            allowed_origins: vec!["*".to_string()],
            enable_hsts: false,
            hsts_max_age: 0,
            admin_username: admin.map(|(u, _)| u.to_string()),
            admin_password: admin.map(|(_, p)| p.to_string()),
        }
    }

    fn repo() -> UserRepository {
        UserRepository::new(Arc::new(DatabaseManager::new_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_creates_admin_once() {
        let repo = repo();
        let config = security(Some(("root", "rootpw")));

        assert!(ensure_admin_user(&repo, &config).await.unwrap());
        assert!(!ensure_admin_user(&repo, &config).await.unwrap());

        let admin = repo.find_by_username("root").await.unwrap().unwrap();
        assert_eq!(repo.find_role(&admin.id).await.unwrap(), Role::Admin);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_skipped_without_credentials() {
        let repo = repo();
        assert!(!ensure_admin_user(&repo, &security(None)).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
