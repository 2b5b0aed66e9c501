//! Authentication extractors.
//!
//! Provides extractors for requiring a signed-in user (or an admin) in route
//! handlers. Anonymous visitors are sent to the login page with a
//! `returnUrl` pointing back at the page they asked for.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Login page path.
pub const LOGIN_PATH: &str = "/account/login";

/// Page shown to signed-in users who lack the admin role.
pub const ACCESS_DENIED_PATH: &str = "/account/access-denied";

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Rejection for the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, returning to the given path afterwards.
    RedirectToLogin(String),
    /// Signed in but not allowed.
    AccessDenied,
    /// Unauthorized response (JSON endpoints).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(return_url) => Redirect::to(&login_url(&return_url)).into_response(),
            Self::AccessDenied => Redirect::to(ACCESS_DENIED_PATH).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Login URL that returns to `return_url` after signing in.
#[must_use]
pub fn login_url(return_url: &str) -> String {
    if return_url.is_empty() || return_url == "/" {
        LOGIN_PATH.to_string()
    } else {
        format!("{LOGIN_PATH}?returnUrl={}", urlencoding::encode(return_url))
    }
}

/// Whether `url` is safe to redirect to after login (same-site path only).
#[must_use]
pub fn is_local_url(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// The request URI before any `nest` prefix was stripped.
fn original_uri(parts: &Parts) -> &Uri {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
}

fn anonymous_rejection(parts: &Parts) -> AuthRejection {
    let uri = original_uri(parts);
    let path = uri.path();
    let is_json = path.ends_with("/files") || path.starts_with("/api/");
    if is_json {
        AuthRejection::Unauthorized
    } else {
        let return_url = uri
            .path_and_query()
            .map_or(path, axum::http::uri::PathAndQuery::as_str);
        AuthRejection::RedirectToLogin(return_url.to_string())
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| anonymous_rejection(parts))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)
            .await
            .ok_or_else(|| anonymous_rejection(parts))?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %original_uri(parts).path(), "Admin page denied");
            return Err(AuthRejection::AccessDenied);
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Helper to set the current user in the session.
///
/// The session ID is cycled first so a pre-login ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_return_path() {
        assert_eq!(login_url("/"), "/account/login");
        assert_eq!(
            login_url("/cart?x=1"),
            "/account/login?returnUrl=%2Fcart%3Fx%3D1"
        );
    }

    #[test]
    fn test_is_local_url() {
        assert!(is_local_url("/orders"));
        assert!(!is_local_url("//evil.example.com"));
        assert!(!is_local_url("/\\evil.example.com"));
        assert!(!is_local_url("https://evil.example.com"));
        assert!(!is_local_url(""));
    }
}
