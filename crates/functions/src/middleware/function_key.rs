//! Function-key authorization.
//!
//! When a key is configured, requests must present it either in the
//! `x-functions-key` header or the `code` query parameter.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the function key.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Query parameter carrying the function key.
pub const FUNCTION_KEY_QUERY: &str = "code";

/// Reject requests without the configured function key.
pub async fn require_function_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key() else {
        return next.run(request).await;
    };

    let presented = presented_key(&request);
    if presented.is_some_and(|key| keys_match(key.as_bytes(), expected.expose_secret().as_bytes()))
    {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected request without a valid function key");
    AppError::Unauthorized.into_response()
}

/// Key from the header, else from the query string.
fn presented_key(request: &Request) -> Option<String> {
    if let Some(value) = request
        .headers()
        .get(FUNCTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(value.to_owned());
    }

    request.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == FUNCTION_KEY_QUERY)
            .map(|(_, value)| value.into_owned())
    })
}

/// Compare without short-circuiting on the first differing byte.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
