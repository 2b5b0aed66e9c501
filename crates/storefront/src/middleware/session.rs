//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. Sessions hold
//! the signed-in user and the pending flash message; they expire after seven
//! days of inactivity.

use argon2::Argon2;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "retail_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Fixed salt for stretching the session secret into a cookie signing key.
const SIGNING_KEY_SALT: &[u8] = b"cloud-retail-session-cookie";

/// Session layer type with signed cookies.
pub type RetailSessionLayer = SessionManagerLayer<PostgresStore, SignedCookie>;

/// Create the session layer with `PostgreSQL` store.
///
/// # Arguments
///
/// * `pool` - `PostgreSQL` connection pool
/// * `config` - Storefront configuration (signing secret; cookie `Secure`
///   follows the base URL scheme)
///
/// # Errors
///
/// Returns an error if the signing key cannot be derived from the secret.
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<RetailSessionLayer, argon2::Error> {
    // Table created by migration 20260301000011
    let store = PostgresStore::new(pool.clone());

    let is_secure = config.base_url.starts_with("https://");

    let key = signing_key(&config.session_secret)?;

    Ok(SessionManagerLayer::new(store)
        .with_signed(key)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/"))
}

/// Stretch the session secret into the 64-byte key the cookie jar signs with.
fn signing_key(secret: &SecretString) -> Result<Key, argon2::Error> {
    let mut bytes = [0u8; 64];
    Argon2::default().hash_password_into(
        secret.expose_secret().as_bytes(),
        SIGNING_KEY_SALT,
        &mut bytes,
    )?;
    Ok(Key::from(&bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_is_deterministic() {
        let secret = SecretString::from("q7Vx!2mR#9tLp$4wZs8@kB1nD6&hF3jY");
        let a = signing_key(&secret).unwrap();
        let b = signing_key(&secret).unwrap();
        assert_eq!(a.master(), b.master());

        let other = signing_key(&SecretString::from("Zp4!Lm9#Qx2$Rt7@Wv5&Ks1*Hd8^Nb3%")).unwrap();
        assert_ne!(a.master(), other.master());
    }
}
