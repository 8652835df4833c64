//! Session cookie helper.
//!
//! The session cookie carries the opaque session token; only its hash is
//! stored server side.

use axum::http::{header::COOKIE, HeaderMap};

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Builds and reads the `session` cookie.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    secure: bool,
    max_age_secs: i64,
}

impl SessionCookie {
    pub fn new(secure: bool, max_age_secs: i64) -> Self {
        Self {
            secure,
            max_age_secs,
        }
    }

    /// Set-Cookie value for a new session.
    pub fn build(&self, token: &str) -> String {
        self.with_attributes(format!(
            "{}={}; Max-Age={}",
            SESSION_COOKIE_NAME, token, self.max_age_secs
        ))
    }

    /// Set-Cookie value that removes the session cookie.
    pub fn clear(&self) -> String {
        self.with_attributes(format!(
            "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            SESSION_COOKIE_NAME
        ))
    }

    /// Reads the session token from the request's Cookie header.
    pub fn extract<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .map(str::trim)
            .find_map(|cookie| {
                let (name, value) = cookie.split_once('=')?;
                (name == SESSION_COOKIE_NAME && !value.is_empty()).then_some(value)
            })
    }

    fn with_attributes(&self, mut cookie: String) -> String {
        cookie.push_str("; Path=/; HttpOnly; SameSite=Lax");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
