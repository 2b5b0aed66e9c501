//! `/api/products[/{pk}[/{rk}]]`: product CRUD dispatched on the HTTP verb.
//!
//! POST and PUT accept an inline image as `ImageFileName` plus
//! `ImageBase64`; it is stored as a blob and the product records its URL.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::instrument;

use cloud_retail_core::{ImageUpload, PRODUCT_PARTITION, ProductModel};

use crate::error::{AppError, Result};
use crate::state::AppState;

use super::{EntityKeys, missing_delete_keys, parse_payload, unsupported_verb};

const INVALID_PAYLOAD: &str = "Invalid product payload.";

/// Build the products router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", any(collection))
        .route("/products/{pk}", any(partition))
        .route("/products/{pk}/{rk}", any(entity))
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

/// Content type for an image file name, by extension.
fn image_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Pull the inline image out of `product` and decode it.
fn inline_image(product: &mut ProductModel) -> Result<Option<ImageUpload>> {
    let Some((file_name, data)) = product.take_inline_image() else {
        return Ok(None);
    };
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|_| AppError::BadRequest("Invalid image payload.".to_string()))?;
    let content_type = image_content_type(&file_name);
    Ok(Some(ImageUpload::new(&file_name, content_type, bytes)))
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
                let product = storage
                    .get_product(pk, rk)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("product {pk}/{rk}")))?;
                return Ok(Json(product).into_response());
            }
            Ok(Json(storage.list_products().await?).into_response())
        }
        Method::POST => {
            let mut product: ProductModel = parse_payload(&body, INVALID_PAYLOAD)?;
            let image = inline_image(&mut product)?;
            let created = storage.add_product(product, image).await?;
            tracing::info!(row_key = %created.row_key, "Product created");
            Ok(Json(created).into_response())
        }
        Method::PUT => {
            let mut product: ProductModel = parse_payload(&body, INVALID_PAYLOAD)?;
            if let Some(pk) = keys.partition_key {
                product.partition_key = pk;
            } else if product.partition_key.trim().is_empty() {
                product.partition_key = PRODUCT_PARTITION.to_string();
            }
            if let Some(rk) = keys.row_key {
                product.row_key = rk;
            }
            if product.row_key.trim().is_empty() {
                return Err(AppError::BadRequest(
                    "RowKey is required for updates.".to_string(),
                ));
            }

            let image = inline_image(&mut product)?;
            let updated = storage.update_product(product, image).await?;
            tracing::info!(row_key = %updated.row_key, "Product updated");
            Ok(Json(updated).into_response())
        }
        Method::DELETE => {
            let (pk, rk) = keys.both().ok_or_else(missing_delete_keys)?;
            if !storage.delete_product(pk, rk).await? {
                return Err(AppError::NotFound(format!("product {pk}/{rk}")));
            }
            tracing::info!(row_key = %rk, "Product deleted");
            Ok(StatusCode::OK.into_response())
        }
        other => Err(unsupported_verb(&other)),
    }
}
