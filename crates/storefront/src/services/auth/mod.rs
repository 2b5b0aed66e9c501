//! Authentication service.
//!
//! Username/password accounts with argon2id hashes. Registration input is
//! validated into a [`Registration`] before anything touches the database.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use cloud_retail_core::{Email, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;
const MAX_FULL_NAME_LENGTH: usize = 100;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 100;

/// Raw registration form values.
#[derive(Debug, Default)]
pub struct RegistrationInput<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub role: &'a str,
}

/// Per-field validation messages, in form order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    /// First message recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A validated registration.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: Email,
    pub full_name: Option<String>,
    pub password: String,
    pub role: UserRole,
}

impl Registration {
    /// Validate form input.
    ///
    /// The role must read exactly `Admin` or `Customer`. `Admin` is only
    /// granted when `allow_admin` is set; otherwise the account is created as
    /// a customer.
    ///
    /// # Errors
    ///
    /// Returns every failed field in `FieldErrors`.
    pub fn validate(input: &RegistrationInput<'_>, allow_admin: bool) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        let username = input.username.trim();
        let username_len = username.chars().count();
        if username.is_empty() {
            errors.add("username", "The Username field is required.");
        } else if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username_len) {
            errors.add(
                "username",
                format!(
                    "Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters."
                ),
            );
        }

        let email = match Email::parse(input.email) {
            Ok(email) => Some(email),
            Err(_) if input.email.trim().is_empty() => {
                errors.add("email", "The Email field is required.");
                None
            }
            Err(_) => {
                errors.add("email", "The Email field is not a valid e-mail address.");
                None
            }
        };

        let full_name = input.full_name.trim();
        if full_name.chars().count() > MAX_FULL_NAME_LENGTH {
            errors.add(
                "full_name",
                format!("Full name must be at most {MAX_FULL_NAME_LENGTH} characters."),
            );
        }

        let password_len = input.password.chars().count();
        if input.password.is_empty() {
            errors.add("password", "The Password field is required.");
        } else if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password_len) {
            errors.add(
                "password",
                format!(
                    "Password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters."
                ),
            );
        }

        if input.password != input.confirm_password {
            errors.add("confirm_password", "Passwords do not match.");
        }

        let role = match input.role {
            "Admin" if allow_admin => Some(UserRole::Admin),
            "Admin" | "Customer" => Some(UserRole::Customer),
            _ => {
                errors.add("role", "Role must be Admin or Customer.");
                None
            }
        };

        match (email, role) {
            (Some(email), Some(role)) if errors.is_empty() => Ok(Self {
                username: username.to_owned(),
                email,
                full_name: (!full_name.is_empty()).then(|| full_name.to_owned()),
                password: input.password.to_owned(),
                role,
            }),
            _ => Err(errors),
        }
    }
}

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Create an account from a validated registration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the username is taken.
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        if self.users.username_exists(&registration.username).await? {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(&registration.password)?;

        self.users
            .create(&NewUser {
                username: &registration.username,
                password_hash: &password_hash,
                role: registration.role,
                email: Some(&registration.email),
                name: registration.full_name.as_deref(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .get_by_username(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        Ok(user)
    }
}

/// Validate password length for accounts created outside the register form.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` when the length is out of range.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(AuthError::WeakPassword(format!(
            "password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input<'a>() -> RegistrationInput<'a> {
        RegistrationInput {
            username: "jdoe",
            email: "jdoe@example.com",
            full_name: "Jane Doe",
            password: "hunter22",
            confirm_password: "hunter22",
            role: "Customer",
        }
    }

    #[test]
    fn test_valid_registration() {
        let registration = Registration::validate(&input(), false).unwrap();
        assert_eq!(registration.username, "jdoe");
        assert_eq!(registration.email.as_str(), "jdoe@example.com");
        assert_eq!(registration.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(registration.role, UserRole::Customer);
    }

    #[test]
    fn test_admin_role_requires_opt_in() {
        let admin = RegistrationInput {
            role: "Admin",
            ..input()
        };
        assert_eq!(
            Registration::validate(&admin, false).unwrap().role,
            UserRole::Customer
        );
        assert_eq!(
            Registration::validate(&admin, true).unwrap().role,
            UserRole::Admin
        );
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let errors = Registration::validate(
            &RegistrationInput {
                role: "admin",
                ..input()
            },
            true,
        )
        .unwrap_err();
        assert_eq!(errors.get("role"), Some("Role must be Admin or Customer."));
    }

    #[test]
    fn test_collects_every_field_error() {
        let errors = Registration::validate(
            &RegistrationInput {
                username: "jd",
                email: "not-an-email",
                password: "123",
                confirm_password: "1234",
                ..input()
            },
            false,
        )
        .unwrap_err();

        assert!(errors.get("username").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match."));
        assert!(errors.get("role").is_none());
    }

    #[test]
    fn test_blank_full_name_is_none() {
        let registration = Registration::validate(
            &RegistrationInput {
                full_name: "   ",
                ..input()
            },
            false,
        )
        .unwrap();
        assert!(registration.full_name.is_none());
    }

    #[test]
    fn test_full_name_length_limit() {
        let long = "x".repeat(101);
        let errors = Registration::validate(
            &RegistrationInput {
                full_name: &long,
                ..input()
            },
            false,
        )
        .unwrap_err();
        assert!(errors.get("full_name").is_some());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_bounds() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(101)).is_err());
    }
}
