//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create the first administrator
//! retail-cli user create -u admin -e admin@example.com -p 'changeme123' -r admin
//!
//! # Create a customer account
//! retail-cli user create -u shopper -e shopper@example.com -p 'changeme123'
//! ```
//!
//! # Environment Variables
//!
//! - `RETAIL_DATABASE_URL` - storefront database (falls back to `DATABASE_URL`)

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use cloud_retail_core::{Email, EmailError, UserRole};
use cloud_retail_storefront::db::RepositoryError;
use cloud_retail_storefront::db::users::{NewUser, UserRepository};
use cloud_retail_storefront::services::auth::{AuthError, hash_password, validate_password};

use super::database_url;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, customer")]
    InvalidRole(String),

    /// Invalid username.
    #[error("Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters")]
    InvalidUsername,

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Username is taken.
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Password rules or hashing failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Insert failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validated account fields.
#[derive(Debug)]
struct NewAccount {
    username: String,
    email: Email,
    role: UserRole,
}

fn validate(username: &str, email: &str, role: &str) -> Result<NewAccount, UserError> {
    let username = username.trim();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username.chars().count()) {
        return Err(UserError::InvalidUsername);
    }

    let role: UserRole = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    Ok(NewAccount {
        username: username.to_owned(),
        email: Email::parse(email)?,
        role,
    })
}

/// Create an account directly, bypassing the register form's role gate.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `UserError` if validation, hashing or the insert fails.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    name: Option<&str>,
    role: &str,
) -> Result<i32, UserError> {
    let account = validate(username, email, role)?;
    validate_password(password)?;

    let url = database_url(&["RETAIL_DATABASE_URL", "DATABASE_URL"])
        .ok_or(UserError::MissingEnvVar("RETAIL_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(url.expose_secret()).await?;
    let users = UserRepository::new(&pool);

    if users.username_exists(&account.username).await? {
        return Err(UserError::UserExists(account.username));
    }

    let password_hash = hash_password(password)?;
    let user = users
        .create(&NewUser {
            username: &account.username,
            password_hash: &password_hash,
            role: account.role,
            email: Some(&account.email),
            name: name.map(str::trim).filter(|n| !n.is_empty()),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => UserError::UserExists(account.username.clone()),
            other => UserError::Repository(other),
        })?;

    tracing::info!("User created successfully!");
    tracing::info!("  ID: {}", user.id);
    tracing::info!("  Username: {}", user.username);
    tracing::info!("  Role: {}", user.role);

    pool.close().await;
    Ok(user.id.as_i32())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_roles_case_insensitively() {
        let account = validate("admin", "admin@example.com", "Admin").unwrap();
        assert_eq!(account.role, UserRole::Admin);
        assert_eq!(account.email.as_str(), "admin@example.com");

        let account = validate(" shopper ", "s@example.com", "customer").unwrap();
        assert_eq!(account.username, "shopper");
        assert_eq!(account.role, UserRole::Customer);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(matches!(
            validate("ab", "a@example.com", "admin"),
            Err(UserError::InvalidUsername)
        ));
        assert!(matches!(
            validate("admin", "not-an-email", "admin"),
            Err(UserError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate("admin", "a@example.com", "owner"),
            Err(UserError::InvalidRole(_))
        ));
    }
}
