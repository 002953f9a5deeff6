//! Authentication API handlers

use crate::api::handlers::AppState;
use crate::api::models::ValidatedJson;
use crate::auth::cookie::{clear_session_cookie, session_cookie};
use crate::auth::middleware::AuthUser;
use crate::auth::models::{LoginRequest, SessionInfo};
use crate::auth::password::verify_password_async;
use crate::core::error::{Result, UserManageError};
use crate::db::models::User;
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::CookieJar;

/// Shared by every login failure so the response does not reveal which check failed
fn invalid_credentials() -> UserManageError {
    UserManageError::AuthenticationError("Invalid username or password".to_string())
}

/// Check a login password against the account, if there is one
///
/// An unknown account is verified against the state's dummy hash so both
/// branches cost one bcrypt verification at the configured work factor.
async fn credentials_match(state: &AppState, user: Option<&User>, password: String) -> Result<bool> {
    let hash = match user {
        Some(user) => user.password_hash.clone(),
        None => state.dummy_hash.as_str().to_owned(),
    };

    let matched = verify_password_async(password, hash).await?;
    Ok(matched && user.is_some())
}

/// Handler for POST /login
///
/// Sets the session cookie and answers with the caller's role as plain text.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, String)> {
    tracing::info!(username = %req.username, "Login attempt");

    let found = state.user_repo.find_by_username(&req.username).await?;
    let matched = credentials_match(&state, found.as_ref(), req.password).await?;

    let user = match found {
        Some(user) if matched => user,
        Some(user) => {
            tracing::warn!(user_id = %user.id, "Invalid password");
            return Err(invalid_credentials());
        }
        None => {
            tracing::warn!(username = %req.username, "Login for unknown username");
            return Err(invalid_credentials());
        }
    };

    let role = state.user_repo.find_role(&user.id).await?;
    let token = state.jwt.issue(&user.id, &user.username, role)?;

    tracing::info!(user_id = %user.id, username = %user.username, role = %role, "Login successful");

    Ok((
        jar.add(session_cookie(token, state.jwt.ttl())),
        role.as_str().to_string(),
    ))
}

/// Handler for GET/POST /logout
///
/// Replaces the session cookie with an expired one. Tokens already handed
/// out stay valid until their `exp`.
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    tracing::info!("Logout");
    (jar.add(clear_session_cookie()), StatusCode::OK)
}

/// Handler for GET /auth - report the identity of the current session
pub async fn auth_check(user: AuthUser) -> Json<SessionInfo> {
    Json(SessionInfo {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}
