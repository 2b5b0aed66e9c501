//! HTTP client for the functions app.
//!
//! The storefront prefers the functions app for queue and contract
//! operations. Every call returns an error when the app is not configured or
//! unreachable, and callers fall back to the storage service directly.

use std::time::Duration;

use reqwest::{Client, StatusCode, multipart};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use cloud_retail_core::{ContractFile, OrderMessage};

/// Header carrying the function key.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the functions app client.
#[derive(Debug, Error)]
pub enum FunctionApiError {
    /// No base URL configured.
    #[error("function app is not configured")]
    NotConfigured,

    /// Request could not be built or sent, or the body was unreadable.
    #[error("function app request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The app answered with a non-success status.
    #[error("function app returned {0}")]
    Status(StatusCode),

    /// A path segment produced an invalid URL.
    #[error("invalid function app URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Client for the functions app JSON API.
#[derive(Clone)]
pub struct FunctionApiClient {
    client: Client,
    base_url: Option<Url>,
    key: Option<SecretString>,
}

impl FunctionApiClient {
    /// Create a client. With no `base_url` every call fails with
    /// `FunctionApiError::NotConfigured`.
    ///
    /// # Errors
    ///
    /// Returns `FunctionApiError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: Option<Url>, key: Option<SecretString>) -> Result<Self, FunctionApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        // Joining relative paths keeps the last segment only with a trailing slash
        let base_url = base_url.map(|mut url| {
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            url
        });
        Ok(Self {
            client,
            base_url,
            key,
        })
    }

    /// Whether a base URL is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path: &str) -> Result<Url, FunctionApiError> {
        let base = self
            .base_url
            .as_ref()
            .ok_or(FunctionApiError::NotConfigured)?;
        Ok(base.join(path)?)
    }

    fn contract_url(&self, name: &str) -> Result<Url, FunctionApiError> {
        self.url(&format!("api/contracts/{}", urlencoding::encode(name)))
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.key {
            Some(key) => request.header(FUNCTION_KEY_HEADER, key.expose_secret()),
            None => request,
        }
    }

    /// Queued order messages (peek).
    ///
    /// # Errors
    ///
    /// Returns `FunctionApiError` if the app is unconfigured, unreachable, or
    /// answers with an error status.
    pub async fn get_queue_messages(&self) -> Result<Vec<OrderMessage>, FunctionApiError> {
        let url = self.url("api/orders/queue")?;
        let response = self.with_key(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(FunctionApiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Files in the contracts share.
    ///
    /// # Errors
    ///
    /// Returns `FunctionApiError` if the app is unconfigured, unreachable, or
    /// answers with an error status.
    pub async fn get_contract_files(&self) -> Result<Vec<ContractFile>, FunctionApiError> {
        let url = self.url("api/contracts")?;
        let response = self.with_key(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(FunctionApiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Upload a contract as multipart field `file`.
    ///
    /// # Errors
    ///
    /// Returns `FunctionApiError` if the app is unconfigured, unreachable, or
    /// answers with an error status.
    pub async fn upload_contract(&self, name: &str, bytes: Vec<u8>) -> Result<(), FunctionApiError> {
        let url = self.url("api/contracts")?;
        let part = multipart::Part::bytes(bytes).file_name(name.to_owned());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .with_key(self.client.post(url))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FunctionApiError::Status(response.status()));
        }
        Ok(())
    }

    /// Download a contract; `Ok(None)` when the app reports 404.
    ///
    /// # Errors
    ///
    /// Returns `FunctionApiError` if the app is unconfigured, unreachable, or
    /// answers with an error status other than 404.
    pub async fn download_contract(&self, name: &str) -> Result<Option<Vec<u8>>, FunctionApiError> {
        let url = self.contract_url(name)?;
        let response = self.with_key(self.client.get(url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            status => Err(FunctionApiError::Status(status)),
        }
    }

    /// Delete a contract; `Ok(false)` when the app reports 404.
    ///
    /// # Errors
    ///
    /// Returns `FunctionApiError` if the app is unconfigured, unreachable, or
    /// answers with an error status other than 404.
    pub async fn delete_contract(&self, name: &str) -> Result<bool, FunctionApiError> {
        let url = self.contract_url(name)?;
        let response = self.with_key(self.client.delete(url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(FunctionApiError::Status(status)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_client_reports_not_configured() {
        let client = FunctionApiClient::new(None, None).unwrap();
        assert!(!client.is_configured());
        assert!(matches!(
            client.url("api/contracts"),
            Err(FunctionApiError::NotConfigured)
        ));
    }

    #[test]
    fn test_urls_keep_base_path() {
        let base = Url::parse("https://fn.example.com/retail").unwrap();
        let client = FunctionApiClient::new(Some(base), None).unwrap();
        assert_eq!(
            client.url("api/orders/queue").unwrap().as_str(),
            "https://fn.example.com/retail/api/orders/queue"
        );
    }

    #[test]
    fn test_contract_names_are_encoded() {
        let base = Url::parse("http://localhost:7071").unwrap();
        let client = FunctionApiClient::new(Some(base), None).unwrap();
        assert_eq!(
            client.contract_url("lease 2026.pdf").unwrap().as_str(),
            "http://localhost:7071/api/contracts/lease%202026.pdf"
        );
    }

    #[tokio::test]
    async fn test_calls_fail_fast_when_unconfigured() {
        let client = FunctionApiClient::new(None, None).unwrap();
        assert!(matches!(
            client.get_contract_files().await,
            Err(FunctionApiError::NotConfigured)
        ));
        assert!(matches!(
            client.delete_contract("a.pdf").await,
            Err(FunctionApiError::NotConfigured)
        ));
    }
}
