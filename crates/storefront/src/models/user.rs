//! Relational domain types.
//!
//! Row types decoded straight from the `retail` schema.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use cloud_retail_core::{CartItemId, OrderId, OrderStatus, UserId, UserRole};

/// A storefront account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One product line in a user's cart.
///
/// `product_id` is the row key of a product table entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: String,
    pub quantity: i32,
}

/// A placed order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
}

/// An order joined with the owner's username, for the admin list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderWithUser {
    pub id: OrderId,
    pub user_id: UserId,
    pub username: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
}
