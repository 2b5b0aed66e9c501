//! Middleware for the functions app.

pub mod function_key;

pub use function_key::{FUNCTION_KEY_HEADER, FUNCTION_KEY_QUERY, require_function_key};
