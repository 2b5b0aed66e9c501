//! Role and status enums.

use serde::{Deserialize, Serialize};

/// Account role for a storefront user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "retail.user_role", rename_all = "snake_case")
)]
pub enum UserRole {
    /// Manages products, customers, orders and contracts.
    Admin,
    /// Browses the catalog and places orders.
    #[default]
    Customer,
}

impl UserRole {
    /// Normalize free-form role input from a registration form.
    ///
    /// Anything that is not `admin` (case-insensitive) becomes `Customer`.
    #[must_use]
    pub fn normalize(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::Customer
        }
    }

    /// Whether this role grants access to the admin area.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "Admin"),
            Self::Customer => write!(f, "Customer"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Lifecycle status of a placed order.
///
/// Orders start as `Pending`; an admin moves them to `Processed` or
/// `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "retail.order_status"))]
pub enum OrderStatus {
    #[default]
    Pending,
    Processed,
    Cancelled,
}

impl OrderStatus {
    /// Parse a status an admin is allowed to assign.
    ///
    /// Only `Processed` and `Cancelled` are accepted; `Pending` is the
    /// initial state and cannot be set by hand.
    #[must_use]
    pub fn parse_admin_update(input: &str) -> Option<Self> {
        match input {
            "Processed" => Some(Self::Processed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Lowercase label used for CSS badges.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Processed => write!(f, "Processed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processed" => Ok(Self::Processed),
            "Cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_normalize() {
        assert_eq!(UserRole::normalize("Admin"), UserRole::Admin);
        assert_eq!(UserRole::normalize(" admin "), UserRole::Admin);
        assert_eq!(UserRole::normalize("Customer"), UserRole::Customer);
        assert_eq!(UserRole::normalize("superuser"), UserRole::Customer);
        assert_eq!(UserRole::normalize(""), UserRole::Customer);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_admin_status_update_whitelist() {
        assert_eq!(
            OrderStatus::parse_admin_update("Processed"),
            Some(OrderStatus::Processed)
        );
        assert_eq!(
            OrderStatus::parse_admin_update("Cancelled"),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(OrderStatus::parse_admin_update("Pending"), None);
        assert_eq!(OrderStatus::parse_admin_update("processed"), None);
        assert_eq!(OrderStatus::parse_admin_update("Shipped"), None);
    }

    #[test]
    fn test_status_serializes_as_pascal_case() {
        let json = serde_json::to_string(&OrderStatus::Pending).unwrap();
        assert_eq!(json, "\"Pending\"");
    }
}
