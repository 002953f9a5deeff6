//! Authentication middleware
//!
//! Two gates guard the private routes. [`authenticate`] turns the session
//! cookie into an [`AuthUser`]; the admin gate turns an [`AuthUser`] with the
//! admin role into an [`AdminUser`]. The admin gate is only installed by
//! [`AdminRoutes`], which also hands its routes an [`AdminState`]. Admin
//! handlers take `State<AdminState>`, and [`AdminUser`] can only be extracted
//! with that state, so an admin handler mounted anywhere else fails to compile.

use crate::api::handlers::AppState;
use crate::auth::cookie::SESSION_COOKIE;
use crate::auth::jwt::{Claims, INVALID_SESSION};
use crate::core::error::{Result, UserManageError};
use crate::db::models::Role;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use axum_extra::extract::CookieJar;
use std::ops::Deref;

/// Identity of the caller, taken from a verified session token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// An [`AuthUser`] whose role has been checked to be admin
#[derive(Clone, Debug)]
pub struct AdminUser(AuthUser);

impl AdminUser {
    fn try_from_user(user: AuthUser) -> Result<Self> {
        if user.role == Role::Admin {
            Ok(Self(user))
        } else {
            Err(UserManageError::PermissionDenied(
                "Administrator role required".to_string(),
            ))
        }
    }

    pub fn identity(&self) -> &AuthUser {
        &self.0
    }
}

/// Session gate
///
/// Reads the `user-jwt` cookie, verifies it and stores the caller's identity
/// in the request extensions. Missing, empty and invalid tokens all get the
/// same 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());

    let token = match jar.get(SESSION_COOKIE).map(|c| c.value()).filter(|v| !v.is_empty()) {
        Some(t) => t.to_string(),
        None => {
            tracing::debug!("Request without session cookie");
            return UserManageError::AuthenticationError(INVALID_SESSION.to_string())
                .into_response();
        }
    };

    let claims = match state.jwt.verify(&token) {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };

    let user = AuthUser::from(claims);
    tracing::debug!(user_id = %user.id, username = %user.username, "Session verified");
    request.extensions_mut().insert(user);

    next.run(request).await
}

/// Admin gate; must run behind [`authenticate`]
async fn require_admin(user: AuthUser, mut request: Request, next: Next) -> Response {
    let admin = match AdminUser::try_from_user(user) {
        Ok(admin) => admin,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(admin);
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = UserManageError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| UserManageError::AuthenticationError(INVALID_SESSION.to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AdminState> for AdminUser {
    type Rejection = UserManageError;

    async fn from_request_parts(parts: &mut Parts, _state: &AdminState) -> Result<Self> {
        parts
            .extensions
            .get::<AdminUser>()
            .cloned()
            .ok_or_else(|| UserManageError::PermissionDenied("Administrator role required".to_string()))
    }
}

/// Application state as seen by routes behind the admin gate
///
/// Only [`AdminRoutes`] can build one.
#[derive(Clone)]
pub struct AdminState(AppState);

impl Deref for AdminState {
    type Target = AppState;

    fn deref(&self) -> &AppState {
        &self.0
    }
}

/// Routes that require a valid session
pub struct SessionRoutes {
    routes: Router<AppState>,
    state: AppState,
}

impl SessionRoutes {
    pub fn new(routes: Router<AppState>, state: AppState) -> Self {
        Self { routes, state }
    }

    /// Wrap the routes in the session gate
    pub fn into_router(self) -> Router<AppState> {
        self.routes
            .layer(middleware::from_fn_with_state(self.state, authenticate))
    }
}

/// Routes that require a valid session with the admin role
pub struct AdminRoutes {
    routes: Router<AdminState>,
    state: AppState,
}

impl AdminRoutes {
    pub fn new(routes: Router<AdminState>, state: AppState) -> Self {
        Self { routes, state }
    }

    /// Session gate outermost, admin gate inside it
    pub fn into_router(self) -> Router<AppState> {
        self.routes
            .layer(middleware::from_fn(require_admin))
            .layer(middleware::from_fn_with_state(self.state.clone(), authenticate))
            .with_state(AdminState(self.state))
    }
}
