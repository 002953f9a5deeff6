use crate::api::models::{MessageResponse, UpdateUserRequest, UserResponse, ValidatedJson};
use crate::auth::middleware::{AdminState, AdminUser};
use crate::core::error::Result;
use axum::{
    extract::{Path, State},
    Json,
};
use super::users::{delete_account, update_account};

/// Handler for GET /users - All accounts with their roles (admin only)
pub async fn list_users(
    State(state): State<AdminState>,
    admin: AdminUser,
) -> Result<Json<Vec<UserResponse>>> {
    tracing::info!(admin_id = %admin.identity().id, "Admin listing users");

    let users = state.user_repo.find_all_with_roles().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Handler for PUT /user/:id - Update any account (admin only)
pub async fn update_user_by_id(
    State(state): State<AdminState>,
    Path(user_id): Path<String>,
    admin: AdminUser,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    tracing::info!(admin_id = %admin.identity().id, user_id = %user_id, "Admin updating user");
    update_account(&state, &user_id, req).await.map(Json)
}

/// Handler for DELETE /user/:id - Delete any account (admin only)
pub async fn delete_user_by_id(
    State(state): State<AdminState>,
    Path(user_id): Path<String>,
    admin: AdminUser,
) -> Result<Json<MessageResponse>> {
    tracing::info!(admin_id = %admin.identity().id, user_id = %user_id, "Admin deleting user");
    delete_account(&state, &user_id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
