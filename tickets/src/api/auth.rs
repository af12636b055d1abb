//! HTTP basic authentication for the admin routes.

use super::error::ApiError;
use crate::config::AdminConfig;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

const REALM_CHALLENGE: &str = r#"Basic realm="tickets admin""#;

/// Operator login checked by [`require_admin`].
#[derive(Clone)]
pub struct AdminCredentials {
    inner: Arc<(String, String)>,
}

impl AdminCredentials {
    /// Credentials for `username` / `password`.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            inner: Arc::new((username.into(), password.into())),
        }
    }

    /// Credentials from the `ADMIN_USER` / `ADMIN_PASSWORD` configuration.
    #[must_use]
    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }

    /// Whether an `Authorization` header value carries these credentials.
    #[must_use]
    pub fn accepts(&self, authorization: &str) -> bool {
        let Some(encoded) = authorization.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        let Some((username, password)) = decoded.split_once(':') else {
            return false;
        };

        let (expected_user, expected_password) = self.inner.as_ref();
        // Both halves are always compared
        let user_ok =
            constant_time_eq::constant_time_eq(username.as_bytes(), expected_user.as_bytes());
        let password_ok =
            constant_time_eq::constant_time_eq(password.as_bytes(), expected_password.as_bytes());
        user_ok & password_ok
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.inner.0)
            .finish_non_exhaustive()
    }
}

/// Reject requests without valid admin credentials with 401 and a basic-auth
/// challenge.
pub async fn require_admin(
    State(credentials): State<AdminCredentials>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| credentials.accepts(value));

    if authorized {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Rejected unauthenticated admin request");
    (
        [(header::WWW_AUTHENTICATE, REALM_CHALLENGE)],
        ApiError::unauthorized("Admin credentials required"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user_pass: &str) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(user_pass)
        )
    }

    #[test]
    fn test_accepts_matching_login() {
        let credentials = AdminCredentials::new("admin", "letmein");
        assert!(credentials.accepts(&basic("admin:letmein")));
    }

    #[test]
    fn test_rejects_wrong_or_malformed_login() {
        let credentials = AdminCredentials::new("admin", "letmein");
        assert!(!credentials.accepts(&basic("admin:wrong")));
        assert!(!credentials.accepts(&basic("root:letmein")));
        assert!(!credentials.accepts(&basic("admin")));
        assert!(!credentials.accepts("Bearer abc"));
        assert!(!credentials.accepts("Basic !!!"));
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let rendered = format!("{:?}", AdminCredentials::new("admin", "letmein"));
        assert!(!rendered.contains("letmein"));
    }
}
