//! Authentication module
//!
//! This module provides authentication functionality including:
//! - Login and logout with a cookie-borne session token
//! - JWT token generation and validation
//! - Password hashing and verification
//! - Session and admin gates for the router

pub mod bootstrap;
pub mod cookie;
pub mod jwt;
pub mod password;
pub mod handlers;
pub mod middleware;
pub mod models;

pub use bootstrap::ensure_admin_user;
pub use cookie::{clear_session_cookie, session_cookie, SESSION_COOKIE};
pub use jwt::{Claims, JwtService};
pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};
pub use middleware::{authenticate, AdminRoutes, AdminState, AdminUser, AuthUser, SessionRoutes};
pub use handlers::{auth_check, login, logout};
