//! CLI command implementations.

pub mod migrate;
pub mod user;

use secrecy::SecretString;

/// Read a connection string, trying each variable in order.
///
/// `.env` is loaded first so local development matches the servers.
pub(crate) fn database_url(keys: &[&'static str]) -> Option<SecretString> {
    dotenvy::dotenv().ok();
    keys.iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .map(SecretString::from)
}
