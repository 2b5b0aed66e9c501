//! Integration tests for Cloud Retail.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (functions app on an ephemeral port, memory storage)
//! cargo test -p cloud-retail-integration-tests
//!
//! # Tests against running servers
//! cargo run -p cloud-retail-cli -- migrate all
//! cargo run -p cloud-retail-storefront &
//! cargo test -p cloud-retail-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - running storefront (default `http://localhost:5000`)
//! - `TEST_ADMIN_USERNAME` / `TEST_ADMIN_PASSWORD` - an admin account created
//!   with `retail-cli user create -r admin`

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Client;
use secrecy::SecretString;
use tokio::net::TcpListener;
use url::Url;

use cloud_retail_functions::routes;
use cloud_retail_functions::state::AppState;
use cloud_retail_storage::{MemoryBackend, Storage, StorageSettings};
use cloud_retail_storefront::services::FunctionApiClient;

/// A functions app served in-process over a memory backend.
pub struct FunctionApp {
    pub addr: SocketAddr,
    pub key: Option<String>,
}

impl FunctionApp {
    /// Bind an ephemeral port and serve the app in the background.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind.
    pub async fn spawn(key: Option<&str>) -> Self {
        let storage = Arc::new(Storage::new(MemoryBackend::new(), StorageSettings::default()));
        let state = AppState::new(storage, key.map(SecretString::from));
        let app = routes::app(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            key: key.map(str::to_owned),
        }
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL for an API path such as `/api/customers`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    /// The storefront's client pointed at this app with its key.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn storefront_client(&self) -> FunctionApiClient {
        let base = Url::parse(&self.base_url()).expect("Invalid base URL");
        FunctionApiClient::new(Some(base), self.key.clone().map(SecretString::from))
            .expect("Failed to build function app client")
    }
}

/// Base URL of a running storefront.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// A client that keeps session cookies and does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A unique, short name for test data.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", id.get(..10).unwrap_or(&id))
}
