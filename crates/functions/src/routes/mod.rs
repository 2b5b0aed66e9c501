//! HTTP route handlers for the functions app.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Liveness
//! GET  /health/ready                         - Storage reachability
//!
//! # Function-key protected
//! ANY  /api/customers[/{pk}[/{rk}]]          - Customer CRUD by HTTP verb
//! ANY  /api/products[/{pk}[/{rk}]]           - Product CRUD by HTTP verb
//! GET  /api/orders/queue                     - Peek queued orders
//! POST /api/orders/queue                     - Enqueue an order message
//! DELETE /api/orders/queue                   - Dequeue the oldest order
//! GET  /api/contracts                        - List contract files
//! POST /api/contracts                        - Upload (multipart `file`)
//! GET  /api/contracts/{file}                 - Download
//! DELETE /api/contracts/{file}               - Delete
//! ```

pub mod contracts;
pub mod customers;
pub mod orders;
pub mod products;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::middleware::require_function_key;
use crate::state::AppState;

/// Partition and row key taken from the route; blank segments count as absent.
#[derive(Debug, Default, Clone)]
pub struct EntityKeys {
    pub partition_key: Option<String>,
    pub row_key: Option<String>,
}

impl EntityKeys {
    #[must_use]
    pub fn partition(partition_key: String) -> Self {
        Self {
            partition_key: non_blank(partition_key),
            row_key: None,
        }
    }

    #[must_use]
    pub fn entity(partition_key: String, row_key: String) -> Self {
        Self {
            partition_key: non_blank(partition_key),
            row_key: non_blank(row_key),
        }
    }

    /// Both keys, when both are present.
    #[must_use]
    pub fn both(&self) -> Option<(&str, &str)> {
        Some((self.partition_key.as_deref()?, self.row_key.as_deref()?))
    }
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

/// Deserialize a JSON body; empty or malformed bodies become `BadRequest(message)`.
pub(crate) fn parse_payload<T: DeserializeOwned>(body: &Bytes, message: &str) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest(message.to_string()));
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected JSON payload");
        AppError::BadRequest(message.to_string())
    })
}

/// Error for verbs an entity route does not handle.
pub(crate) fn unsupported_verb(method: &axum::http::Method) -> AppError {
    tracing::warn!(%method, "Unsupported HTTP method");
    AppError::BadRequest("Unsupported HTTP verb.".to_string())
}

/// Error for deletes that do not name both keys.
pub(crate) fn missing_delete_keys() -> AppError {
    AppError::BadRequest(
        "PartitionKey and RowKey are required for delete operations.".to_string(),
    )
}

/// Create the function-key protected API router.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(customers::routes())
        .merge(products::routes())
        .merge(orders::routes())
        .merge(contracts::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_function_key,
        ))
}

/// Create the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(&state))
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the storage backend is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.storage().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check: storage unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, Response},
    };
    use secrecy::SecretString;
    use tower::ServiceExt;

    use cloud_retail_storage::{MemoryBackend, Storage, StorageSettings};

    use crate::state::AppState;

    pub fn state_with_key(key: Option<&str>) -> AppState {
        let storage = Arc::new(Storage::new(MemoryBackend::new(), StorageSettings::default()));
        AppState::new(storage, key.map(SecretString::from))
    }

    pub fn app() -> Router {
        super::app(state_with_key(None))
    }

    pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    pub async fn body_text(response: Response<Body>) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::test_support::*;
    use super::test_support::app;
    use super::*;

    #[test]
    fn test_entity_keys_treat_blank_as_absent() {
        let keys = EntityKeys::entity("Customer".to_string(), " ".to_string());
        assert_eq!(keys.partition_key.as_deref(), Some("Customer"));
        assert!(keys.row_key.is_none());
        assert!(keys.both().is_none());

        let keys = EntityKeys::entity("Customer".to_string(), "c-1".to_string());
        assert_eq!(keys.both(), Some(("Customer", "c-1")));
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app();
        let response = send(&app, empty_request("GET", "/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, empty_request("GET", "/health/ready")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_function_key_required_when_configured() {
        let app = super::app(state_with_key(Some("0123456789abcdef")));

        let response = send(&app, empty_request("GET", "/api/customers")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, empty_request("GET", "/api/customers?code=wrong")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            empty_request("GET", "/api/customers?code=0123456789abcdef"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let mut request = empty_request("GET", "/api/customers");
        request.headers_mut().insert(
            crate::middleware::FUNCTION_KEY_HEADER,
            "0123456789abcdef".parse().unwrap(),
        );
        assert_eq!(send(&app, request).await.status(), StatusCode::OK);

        // Health stays open
        let response = send(&app, empty_request("GET", "/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
