//! Business logic services for the storefront.
//!
//! - [`auth`] - registration and password login (argon2id)
//! - [`checkout`] - pricing a cart into an order message
//! - [`function_api`] - HTTP client for the functions app

pub mod auth;
pub mod checkout;
pub mod function_api;

pub use auth::{AuthError, AuthService, FieldErrors, Registration, RegistrationInput};
pub use checkout::{CartLine, PricedCart, load_cart_lines, order_message, price_cart};
pub use function_api::{FunctionApiClient, FunctionApiError};
