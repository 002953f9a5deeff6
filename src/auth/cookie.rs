//! Session cookie construction

use axum_extra::extract::cookie::{Cookie, SameSite};
use std::time::Duration;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "user-jwt";

/// Cookie carrying a freshly issued session token
pub fn session_cookie(token: String, ttl: Duration) -> Cookie<'static> {
    let max_age = time::Duration::seconds(ttl.as_secs() as i64);
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .expires(time::OffsetDateTime::now_utc() + max_age)
        .build()
}

/// Empty, already expired cookie that replaces the session token
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), Duration::from_secs(1800));
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(1800)));
    }

    #[test]
    fn test_cleared_cookie_is_expired() {
        let cookie = clear_session_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));

        let rendered = cookie.to_string();
        assert!(rendered.starts_with("user-jwt=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("HttpOnly"));
    }
}
