//! `/api/orders/queue`: the orders queue.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::instrument;

use cloud_retail_core::OrderMessage;

use crate::error::Result;
use crate::state::AppState;

use super::parse_payload;

/// Build the orders queue router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/orders/queue", get(peek).post(enqueue).delete(dequeue))
}

/// Queued orders, oldest first, without removing them.
#[instrument(skip(state))]
async fn peek(State(state): State<AppState>) -> Result<Json<Vec<OrderMessage>>> {
    Ok(Json(state.storage().peek_orders().await?))
}

/// Publish an order message.
#[instrument(skip(state, body))]
async fn enqueue(State(state): State<AppState>, body: Bytes) -> Result<Json<OrderMessage>> {
    let message: OrderMessage = parse_payload(&body, "Invalid order payload.")?;
    state.storage().enqueue_order(&message).await?;
    tracing::info!(order_id = %message.order_id, "Order message enqueued");
    Ok(Json(message))
}

/// Receive and delete the oldest message; 204 when the queue is empty.
#[instrument(skip(state))]
async fn dequeue(State(state): State<AppState>) -> Result<Response> {
    match state.storage().dequeue_order().await? {
        Some(message) => {
            tracing::info!(order_id = %message.order_id, "Order message dequeued");
            Ok(Json(message).into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::*;

    fn message(order_id: i32) -> serde_json::Value {
        json!({
            "OrderId": order_id,
            "UserId": 7,
            "Items": [{ "ProductId": "p-1", "Quantity": 2, "UnitPrice": 4.5 }],
            "TotalAmount": 9.0,
            "OrderDate": "2026-03-01T12:00:00Z",
            "Status": "Pending"
        })
    }

    #[tokio::test]
    async fn test_peek_is_non_destructive_and_dequeue_removes() {
        let app = app();
        for id in [1, 2] {
            let response = send(&app, json_request("POST", "/api/orders/queue", &message(id))).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        for _ in 0..2 {
            let response = send(&app, empty_request("GET", "/api/orders/queue")).await;
            assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
        }

        let response = send(&app, empty_request("DELETE", "/api/orders/queue")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["OrderId"], 1);

        let response = send(&app, empty_request("GET", "/api/orders/queue")).await;
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

        send(&app, empty_request("DELETE", "/api/orders/queue")).await;
        let response = send(&app, empty_request("DELETE", "/api/orders/queue")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_invalid_payload() {
        let app = app();
        let response = send(
            &app,
            json_request("POST", "/api/orders/queue", &json!({ "OrderId": "x" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid order payload.");
    }
}
