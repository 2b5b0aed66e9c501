//! `/api/customers[/{pk}[/{rk}]]`: customer CRUD dispatched on the HTTP verb.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
};
use tracing::instrument;

use cloud_retail_core::{CUSTOMER_PARTITION, CustomerModel};

use crate::error::{AppError, Result};
use crate::state::AppState;

use super::{EntityKeys, missing_delete_keys, parse_payload, unsupported_verb};

const INVALID_PAYLOAD: &str = "Invalid customer payload.";

/// Build the customers router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", any(collection))
        .route("/customers/{pk}", any(partition))
        .route("/customers/{pk}/{rk}", any(entity))
}

async fn collection(state: State<AppState>, method: Method, body: Bytes) -> Result<Response> {
    handle(state, method, EntityKeys::default(), body).await
}

async fn partition(
    state: State<AppState>,
    method: Method,
    Path(pk): Path<String>,
    body: Bytes,
) -> Result<Response> {
    handle(state, method, EntityKeys::partition(pk), body).await
}

async fn entity(
    state: State<AppState>,
    method: Method,
    Path((pk, rk)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response> {
    handle(state, method, EntityKeys::entity(pk, rk), body).await
}

#[instrument(skip(state, body))]
async fn handle(
    State(state): State<AppState>,
    method: Method,
    keys: EntityKeys,
    body: Bytes,
) -> Result<Response> {
    let storage = state.storage();

    match method {
        Method::GET => {
            if let Some((pk, rk)) = keys.both() {
                let customer = storage
                    .get_customer(pk, rk)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("customer {pk}/{rk}")))?;
                return Ok(Json(customer).into_response());
            }
            Ok(Json(storage.list_customers().await?).into_response())
        }
        Method::POST => {
            let customer: CustomerModel = parse_payload(&body, INVALID_PAYLOAD)?;
            let created = storage.add_customer(customer).await?;
            tracing::info!(row_key = %created.row_key, "Customer created");
            Ok(Json(created).into_response())
        }
        Method::PUT => {
            let mut customer: CustomerModel = parse_payload(&body, INVALID_PAYLOAD)?;
            if let Some(pk) = keys.partition_key {
                customer.partition_key = pk;
            } else if customer.partition_key.trim().is_empty() {
                customer.partition_key = CUSTOMER_PARTITION.to_string();
            }
            if let Some(rk) = keys.row_key {
                customer.row_key = rk;
            }
            if customer.row_key.trim().is_empty() {
                return Err(AppError::BadRequest(
                    "RowKey is required for updates.".to_string(),
                ));
            }

            let updated = storage.update_customer(customer).await?;
            tracing::info!(row_key = %updated.row_key, "Customer updated");
            Ok(Json(updated).into_response())
        }
        Method::DELETE => {
            let (pk, rk) = keys.both().ok_or_else(missing_delete_keys)?;
            if !storage.delete_customer(pk, rk).await? {
                return Err(AppError::NotFound(format!("customer {pk}/{rk}")));
            }
            tracing::info!(row_key = %rk, "Customer deleted");
            Ok(StatusCode::OK.into_response())
        }
        other => Err(unsupported_verb(&other)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::*;

    #[tokio::test]
    async fn test_post_without_body_is_bad_request() {
        let app = app();
        let response = send(&app, empty_request("POST", "/api/customers")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid customer payload.");

        let mut request = empty_request("POST", "/api/customers");
        *request.body_mut() = "{not json".into();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_fills_keys_then_get_by_keys() {
        let app = app();
        let response = send(
            &app,
            json_request(
                "POST",
                "/api/customers",
                &json!({ "FirstName": "Ada", "LastName": "Lovelace", "Email": "ada@example.com" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let created = body_json(response).await;
        assert_eq!(created["PartitionKey"], "Customer");
        let row_key = created["RowKey"].as_str().unwrap().to_string();
        assert!(!row_key.is_empty());

        let response = send(
            &app,
            empty_request("GET", &format!("/api/customers/Customer/{row_key}")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["FirstName"], "Ada");

        let response = send(&app, empty_request("GET", "/api/customers")).await;
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_customer_is_not_found() {
        let app = app();
        let response = send(&app, empty_request("GET", "/api/customers/Customer/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_route_keys_override_body() {
        let app = app();
        let response = send(
            &app,
            json_request(
                "PUT",
                "/api/customers/Customer/c-1",
                &json!({ "PartitionKey": "Other", "RowKey": "other", "FirstName": "Grace" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["PartitionKey"], "Customer");
        assert_eq!(updated["RowKey"], "c-1");

        let response = send(&app, empty_request("GET", "/api/customers/Customer/c-1")).await;
        assert_eq!(body_json(response).await["FirstName"], "Grace");
    }

    #[tokio::test]
    async fn test_put_without_row_key_is_bad_request() {
        let app = app();
        let response = send(
            &app,
            json_request("PUT", "/api/customers", &json!({ "FirstName": "Grace" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "RowKey is required for updates.");
    }

    #[tokio::test]
    async fn test_delete_requires_both_keys_and_existing_entity() {
        let app = app();
        let response = send(&app, empty_request("DELETE", "/api/customers/Customer")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, empty_request("DELETE", "/api/customers/Customer/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        send(
            &app,
            json_request("PUT", "/api/customers/Customer/c-1", &json!({ "FirstName": "Ada" })),
        )
        .await;
        let response = send(&app, empty_request("DELETE", "/api/customers/Customer/c-1")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, empty_request("GET", "/api/customers/Customer/c-1")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unsupported_verb() {
        let app = app();
        let response = send(&app, empty_request("PATCH", "/api/customers")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Unsupported HTTP verb.");
    }
}
