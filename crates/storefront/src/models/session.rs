//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use cloud_retail_core::{UserId, UserRole};

use super::user::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Role checked by the admin extractors.
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Where this user lands after signing in.
    #[must_use]
    pub const fn home_path(&self) -> &'static str {
        if self.is_admin() {
            "/home/admin"
        } else {
            "/home/customer"
        }
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_path_by_role() {
        let mut user = CurrentUser {
            id: UserId::new(1),
            username: "sam".to_owned(),
            role: UserRole::Customer,
        };
        assert_eq!(user.home_path(), "/home/customer");

        user.role = UserRole::Admin;
        assert_eq!(user.home_path(), "/home/admin");
    }
}
