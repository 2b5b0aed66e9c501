//! Domain models for the storefront.
//!
//! - [`session`] - identity and flash messages kept in the session
//! - [`user`] - relational rows: users, cart lines, orders

pub mod flash;
pub mod session;
pub mod user;

pub use flash::{Flash, FlashKind};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{CartItem, Order, OrderWithUser, User};
