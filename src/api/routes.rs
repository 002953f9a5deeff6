//! API routes

use crate::api::handlers::{
    create_user, delete_me, delete_user_by_id, get_me, health_check, list_users, ping,
    update_me, update_user_by_id, AppState,
};
use crate::auth::handlers::{auth_check, login, logout};
use crate::auth::middleware::{AdminRoutes, SessionRoutes};
use axum::{
    routing::{get, post, put},
    Router,
};

/// Build the API routes
pub fn build_api_routes(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/logout", get(logout).post(logout))
        .route("/user", post(create_user));

    // Routes acting on the caller's own account
    let session_routes = SessionRoutes::new(
        Router::new()
            .route("/auth", get(auth_check))
            .route(
                "/user",
                get(get_me).put(update_me).patch(update_me).delete(delete_me),
            ),
        state.clone(),
    );

    // Routes acting on any account
    let admin_routes = AdminRoutes::new(
        Router::new()
            .route("/users", get(list_users))
            .route("/user/:id", put(update_user_by_id).delete(delete_user_by_id)),
        state.clone(),
    );

    public_routes
        .merge(session_routes.into_router())
        .merge(admin_routes.into_router())
        .with_state(state)
}
