use crate::api::models::{
    CreateUserRequest, MessageResponse, UpdateUserRequest, UserResponse, ValidatedJson,
};
use crate::auth::middleware::AuthUser;
use crate::auth::password::hash_password_async;
use crate::core::error::{Result, UserManageError};
use crate::db::models::{Role, User, UserChanges};
use crate::db::repository::Repository;
use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;
use super::AppState;

/// Handler for POST /user - Create an account with the `user` role
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    tracing::info!(username = %req.username, "Creating user");

    let password_hash = hash_password_async(req.password, state.bcrypt_cost).await?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state.user_repo.create_with_role(&user, Role::User).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User created");

    let mut response = UserResponse::from(user);
    response.role = Some(Role::User);
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET /user - Current account
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserResponse>> {
    tracing::debug!(user_id = %user.id, "Getting current user");

    let found = state.user_repo.find_with_role(&user.id).await?
        .ok_or_else(|| UserManageError::NotFound(format!("User {} not found", user.id)))?;

    Ok(Json(UserResponse::from(found)))
}

/// Handler for PUT/PATCH /user - Update the current account
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    tracing::info!(user_id = %user.id, "Updating current user");
    update_account(&state, &user.id, req).await.map(Json)
}

/// Handler for DELETE /user - Delete the current account
pub async fn delete_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MessageResponse>> {
    tracing::info!(user_id = %user.id, "Deleting current user");
    delete_account(&state, &user.id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// Apply an update to the account with the given id
///
/// The id always comes from the session or the admin route path.
pub(crate) async fn update_account(
    state: &AppState,
    id: &str,
    req: UpdateUserRequest,
) -> Result<UserResponse> {
    let password_hash = match req.password {
        Some(password) => Some(hash_password_async(password, state.bcrypt_cost).await?),
        None => None,
    };

    let changes = UserChanges {
        username: req.username,
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
    };

    let updated = state.user_repo.update_fields(id, changes).await?;
    let role = state.user_repo.find_role(id).await?;

    tracing::info!(user_id = %id, "User updated");

    let mut response = UserResponse::from(updated);
    response.role = Some(role);
    Ok(response)
}

/// Remove role assignments and the account in one transaction
pub(crate) async fn delete_account(state: &AppState, id: &str) -> Result<()> {
    state.user_repo.delete(id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(())
}
