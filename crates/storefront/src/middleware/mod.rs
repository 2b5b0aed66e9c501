//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (tag the span and Sentry scope)
//! 4. Security headers (CSP, framing, referrer)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting on the login and register forms (governor)
//!
//! Auth is enforced per handler through the extractors in [`auth`].

pub mod auth;
pub mod page;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, is_local_url, set_current_user,
};
pub use page::{PageContext, set_flash};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{RetailSessionLayer, create_session_layer};
