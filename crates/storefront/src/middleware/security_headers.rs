//! Security headers middleware.
//!
//! Adds restrictive headers to every response. The only origin allowed
//! beyond `'self'` is the product image host, when images are served from
//! an absolute `STORAGE_BLOB_BASE_URL`.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use crate::state::AppState;

/// Build the CSP for the given image base URL.
///
/// ```text
/// default-src 'none';
/// script-src 'self';
/// style-src 'self';
/// img-src 'self' [image origin];
/// connect-src 'self';
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none'
/// ```
#[must_use]
pub fn content_security_policy(image_base_url: &str) -> String {
    let img_src = image_origin(image_base_url)
        .map_or_else(|| "'self'".to_string(), |origin| format!("'self' {origin}"));
    format!(
        "default-src 'none'; \
         script-src 'self'; \
         style-src 'self'; \
         img-src {img_src}; \
         connect-src 'self'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

/// Origin of an absolute URL; `None` for relative prefixes like `/images`.
fn image_origin(base_url: &str) -> Option<String> {
    let url = Url::parse(base_url).ok()?;
    matches!(url.scheme(), "http" | "https")
        .then(|| url.origin().ascii_serialization())
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: same-origin`
/// - `Content-Security-Policy` (see [`content_security_policy`])
/// - `Permissions-Policy` denying camera, microphone, geolocation, payment
/// - `Cache-Control: no-store` on HTML only, so images and CSS stay cacheable
/// - `Cross-Origin-Opener-Policy: same-origin`
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let csp = content_security_policy(&state.config().storage.settings.blob_base_url);
    let mut response = next.run(request).await;

    let is_html = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));

    let headers = response.headers_mut();
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));

    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("camera=(), geolocation=(), microphone=(), payment=(), usb=()"),
    );

    // Pages carry per-user cart and flash content
    if is_html {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_image_prefix_keeps_self_only() {
        let csp = content_security_policy("/images");
        assert!(csp.contains("img-src 'self';"));
    }

    #[test]
    fn test_absolute_image_host_is_allowed() {
        let csp = content_security_policy("https://cdn.example.com/productimages");
        assert!(csp.contains("img-src 'self' https://cdn.example.com;"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }
}
