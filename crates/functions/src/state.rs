//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;

use cloud_retail_core::StorageService;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    storage: Arc<dyn StorageService>,
    api_key: Option<SecretString>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// With no `api_key` every request is accepted.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageService>, api_key: Option<SecretString>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { storage, api_key }),
        }
    }

    /// Get the storage service.
    #[must_use]
    pub fn storage(&self) -> &dyn StorageService {
        self.inner.storage.as_ref()
    }

    /// Get the configured function key, if any.
    #[must_use]
    pub fn api_key(&self) -> Option<&SecretString> {
        self.inner.api_key.as_ref()
    }
}
