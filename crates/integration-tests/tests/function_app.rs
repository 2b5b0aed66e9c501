//! End-to-end tests for the functions app over real HTTP.
//!
//! Each test serves its own app on an ephemeral port with in-memory storage,
//! so nothing external is required.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use cloud_retail_core::{ContractFile, OrderMessage};
use cloud_retail_integration_tests::FunctionApp;
use cloud_retail_storefront::services::FunctionApiError;

const KEY: &str = "integration-test-function-key";

// ============================================================================
// Function key
// ============================================================================

#[tokio::test]
async fn test_api_requires_key_but_health_does_not() {
    let app = FunctionApp::spawn(Some(KEY)).await;
    let client = Client::new();

    let resp = client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to call health");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(app.url("/api/customers"))
        .send()
        .await
        .expect("Failed to call API");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(app.url("/api/customers"))
        .header("x-functions-key", KEY)
        .send()
        .await
        .expect("Failed to call API");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(app.url(&format!("/api/customers?code={KEY}")))
        .send()
        .await
        .expect("Failed to call API");
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Customers
// ============================================================================

#[tokio::test]
async fn test_customer_lifecycle() {
    let app = FunctionApp::spawn(None).await;
    let client = Client::new();

    let created: Value = client
        .post(app.url("/api/customers"))
        .json(&json!({ "FirstName": "Grace", "LastName": "Hopper", "Email": "grace@example.com" }))
        .send()
        .await
        .expect("Failed to create customer")
        .json()
        .await
        .expect("Invalid customer JSON");
    assert_eq!(created["PartitionKey"], "Customer");
    let rk = created["RowKey"].as_str().expect("RowKey missing").to_string();

    let resp = client
        .put(app.url(&format!("/api/customers/Customer/{rk}")))
        .json(&json!({ "FirstName": "Grace", "LastName": "Murray Hopper", "Email": "grace@example.com" }))
        .send()
        .await
        .expect("Failed to update customer");
    assert_eq!(resp.status(), StatusCode::OK);

    let fetched: Value = client
        .get(app.url(&format!("/api/customers/Customer/{rk}")))
        .send()
        .await
        .expect("Failed to get customer")
        .json()
        .await
        .expect("Invalid customer JSON");
    assert_eq!(fetched["LastName"], "Murray Hopper");

    let resp = client
        .delete(app.url(&format!("/api/customers/Customer/{rk}")))
        .send()
        .await
        .expect("Failed to delete customer");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(app.url(&format!("/api/customers/Customer/{rk}")))
        .send()
        .await
        .expect("Failed to get customer");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_product_with_inline_image_is_listed_with_blob_path() {
    let app = FunctionApp::spawn(None).await;
    let client = Client::new();

    let resp = client
        .post(app.url("/api/products"))
        .json(&json!({
            "RowKey": "p-42",
            "Name": "Teapot",
            "Price": 18.5,
            "ImageFileName": "teapot.png",
            "ImageBase64": "iVBORw0KGgo="
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::OK);

    let products: Vec<Value> = client
        .get(app.url("/api/products"))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Invalid product JSON");
    assert_eq!(products.len(), 1);
    let image = products
        .first()
        .and_then(|p| p["ImageBlobPath"].as_str())
        .expect("ImageBlobPath missing");
    assert!(image.ends_with("p-42_teapot.png"), "unexpected blob path {image}");
}

// ============================================================================
// Order queue, through the storefront client
// ============================================================================

#[tokio::test]
async fn test_queue_round_trip_through_storefront_client() {
    let app = FunctionApp::spawn(Some(KEY)).await;
    let client = Client::new();

    for order_id in [1, 2] {
        let resp = client
            .post(app.url("/api/orders/queue"))
            .header("x-functions-key", KEY)
            .json(&json!({ "OrderId": order_id, "UserId": 9, "Items": [], "TotalAmount": 10.0 }))
            .send()
            .await
            .expect("Failed to enqueue");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let peeked: Vec<OrderMessage> = app
        .storefront_client()
        .get_queue_messages()
        .await
        .expect("Failed to peek queue");
    assert_eq!(peeked.len(), 2);

    let resp = client
        .delete(app.url("/api/orders/queue"))
        .header("x-functions-key", KEY)
        .send()
        .await
        .expect("Failed to dequeue");
    assert_eq!(resp.status(), StatusCode::OK);
    let first: OrderMessage = resp.json().await.expect("Invalid order JSON");
    assert_eq!(first.order_id.as_i32(), 1);

    let remaining = app
        .storefront_client()
        .get_queue_messages()
        .await
        .expect("Failed to peek queue");
    assert_eq!(remaining.len(), 1);
}

// ============================================================================
// Contracts, through the storefront client
// ============================================================================

#[tokio::test]
async fn test_contract_lifecycle_through_storefront_client() {
    let app = FunctionApp::spawn(Some(KEY)).await;
    let functions = app.storefront_client();

    functions
        .upload_contract("lease 2024.pdf", b"%PDF-1.7 lease".to_vec())
        .await
        .expect("Failed to upload contract");

    let files: Vec<ContractFile> = functions
        .get_contract_files()
        .await
        .expect("Failed to list contracts");
    assert_eq!(
        files,
        vec![ContractFile {
            name: "lease 2024.pdf".to_string(),
            size: 14,
        }]
    );

    let bytes = functions
        .download_contract("lease 2024.pdf")
        .await
        .expect("Failed to download contract");
    assert_eq!(bytes.as_deref(), Some(&b"%PDF-1.7 lease"[..]));

    assert!(
        functions
            .delete_contract("lease 2024.pdf")
            .await
            .expect("Failed to delete contract")
    );
    assert!(
        !functions
            .delete_contract("lease 2024.pdf")
            .await
            .expect("Failed to delete contract")
    );
    assert_eq!(
        functions
            .download_contract("lease 2024.pdf")
            .await
            .expect("Failed to download contract"),
        None
    );
}

#[tokio::test]
async fn test_storefront_client_surfaces_wrong_key() {
    let app = FunctionApp::spawn(Some(KEY)).await;
    let wrong = FunctionApp {
        addr: app.addr,
        key: Some("not-the-key-at-all".to_string()),
    };

    let err = wrong
        .storefront_client()
        .get_contract_files()
        .await
        .expect_err("Wrong key should be rejected");
    assert!(matches!(
        err,
        FunctionApiError::Status(StatusCode::UNAUTHORIZED)
    ));
}
