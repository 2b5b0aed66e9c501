//! Product catalog route handlers.
//!
//! Anyone may browse; create, edit and delete require an admin. Writes from
//! the forms land in the `Product` partition; lookups and deletes use the
//! keys in the URL.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cloud_retail_core::{ImageUpload, PRODUCT_PARTITION, ProductModel, StorageError, StorageService};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin, RequireAuth};
use crate::models::Flash;
use crate::state::AppState;

use super::cart::add_to_cart_and_redirect;
use super::forms::MultipartForm;
use super::redirect_with_flash;

/// Multipart field carrying the product image.
const IMAGE_FIELD: &str = "image_file";

const MAX_NAME_LENGTH: usize = 100;

// =============================================================================
// Form Types
// =============================================================================

/// Values shown in the create/edit form.
#[derive(Debug, Clone, Default)]
pub struct ProductFormValues {
    pub row_key: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: Option<String>,
}

impl From<&ProductModel> for ProductFormValues {
    fn from(product: &ProductModel) -> Self {
        Self {
            row_key: product.row_key.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            image_url: product.image_blob_path.clone(),
        }
    }
}

impl ProductFormValues {
    fn from_multipart(form: &MultipartForm) -> Self {
        Self {
            row_key: form.text("row_key"),
            name: form.text("name"),
            description: form.text("description"),
            price: form.text("price"),
            image_url: None,
        }
    }

    /// Check required fields and parse the price.
    fn validate(&self) -> std::result::Result<Decimal, String> {
        if self.name.is_empty() {
            return Err("The Name field is required.".to_string());
        }
        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(format!(
                "Name must be at most {MAX_NAME_LENGTH} characters."
            ));
        }
        match Decimal::from_str(&self.price) {
            Ok(price) if !price.is_sign_negative() => Ok(price),
            _ => Err("Price must be a non-negative number.".to_string()),
        }
    }
}

/// Add-to-cart shortcut form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    #[serde(default)]
    pub product_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing page.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductModel>,
}

/// Product details page.
#[derive(Template, WebTemplate)]
#[template(path = "products/details.html")]
pub struct ProductDetailsTemplate {
    pub page: PageContext,
    pub product: ProductModel,
}

/// Create/edit form page.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub title: &'static str,
    pub action: String,
    pub values: ProductFormValues,
    pub error: Option<String>,
}

/// Delete confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "products/delete.html")]
pub struct ProductDeleteTemplate {
    pub page: PageContext,
    pub product: ProductModel,
}

fn image_upload(form: &mut MultipartForm) -> Option<ImageUpload> {
    form.take_file(IMAGE_FIELD)
        .map(|file| ImageUpload::new(&file.file_name, file.content_type, file.bytes))
}

fn product_path(product: &ProductModel) -> String {
    format!(
        "/products/{}/{}",
        urlencoding::encode(&product.partition_key),
        urlencoding::encode(&product.row_key)
    )
}

async fn find_product(state: &AppState, pk: &str, rk: &str) -> Result<ProductModel> {
    if pk.trim().is_empty() || rk.trim().is_empty() {
        return Err(AppError::NotFound("product".to_string()));
    }
    state
        .storage()
        .get_product(pk, rk)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {pk}/{rk}")))
}

// =============================================================================
// Browse
// =============================================================================

/// Product listing, newest first.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> Result<ProductsIndexTemplate> {
    let products = state.storage().list_products().await?;
    Ok(ProductsIndexTemplate { page, products })
}

/// Product details.
#[instrument(skip(state, page))]
pub async fn details(
    State(state): State<AppState>,
    Path((pk, rk)): Path<(String, String)>,
    page: PageContext,
) -> Result<ProductDetailsTemplate> {
    let product = find_product(&state, &pk, &rk).await?;
    Ok(ProductDetailsTemplate { page, product })
}

/// Add one unit of a product to the signed-in user's cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn add_to_cart(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    if form.product_id.trim().is_empty() {
        return Ok(Redirect::to("/products"));
    }
    add_to_cart_and_redirect(&state, &session, &user, form.product_id.trim(), 1).await
}

// =============================================================================
// Create
// =============================================================================

/// Display the create form.
pub async fn create_page(RequireAdmin(_admin): RequireAdmin, page: PageContext) -> impl IntoResponse {
    ProductFormTemplate {
        page,
        title: "Create Product",
        action: "/products/create".to_string(),
        values: ProductFormValues::default(),
        error: None,
    }
}

/// Create a product, uploading the optional image first.
#[instrument(skip(state, session, admin, page, multipart), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::collect(multipart).await?;
    let values = ProductFormValues::from_multipart(&form);

    let price = match values.validate() {
        Ok(price) => price,
        Err(error) => {
            return Ok(ProductFormTemplate {
                page,
                title: "Create Product",
                action: "/products/create".to_string(),
                values,
                error: Some(format!("Please correct the errors and try again. {error}")),
            }
            .into_response());
        }
    };

    let product = ProductModel {
        partition_key: PRODUCT_PARTITION.to_string(),
        name: values.name,
        description: values.description,
        price,
        ..ProductModel::default()
    };

    let created = state
        .storage()
        .add_product(product, image_upload(&mut form))
        .await?;
    tracing::info!(row_key = %created.row_key, "Product created");

    let flash = Flash::success(format!("Product '{}' created successfully!", created.name));
    Ok(redirect_with_flash(&session, flash, "/products")
        .await?
        .into_response())
}

// =============================================================================
// Edit
// =============================================================================

/// Display the edit form.
#[instrument(skip(state, _admin, page))]
pub async fn edit_page(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((pk, rk)): Path<(String, String)>,
    page: PageContext,
) -> Result<ProductFormTemplate> {
    let product = find_product(&state, &pk, &rk).await?;
    Ok(ProductFormTemplate {
        page,
        title: "Edit Product",
        action: format!("{}/edit", product_path(&product)),
        values: ProductFormValues::from(&product),
        error: None,
    })
}

/// Update a product; a new image replaces the old blob.
#[instrument(skip(state, session, admin, page, multipart), fields(admin_id = %admin.id))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path((pk, rk)): Path<(String, String)>,
    page: PageContext,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::collect(multipart).await?;
    let values = ProductFormValues::from_multipart(&form);

    // The form must target the product in the URL
    if values.row_key != rk {
        return Err(AppError::NotFound(format!("product {pk}/{rk}")));
    }

    let existing = find_product(&state, &pk, &rk).await?;

    let price = match values.validate() {
        Ok(price) => price,
        Err(error) => {
            return Ok(ProductFormTemplate {
                page,
                title: "Edit Product",
                action: format!("{}/edit", product_path(&existing)),
                values: ProductFormValues {
                    image_url: existing.image_blob_path,
                    ..values
                },
                error: Some(format!("Please correct the errors and try again. {error}")),
            }
            .into_response());
        }
    };

    let product = ProductModel {
        partition_key: PRODUCT_PARTITION.to_string(),
        name: values.name,
        description: values.description,
        price,
        ..existing
    };
    let name = product.name.clone();

    let flash = match state
        .storage()
        .update_product(product, image_upload(&mut form))
        .await
    {
        Ok(_) => {
            tracing::info!(row_key = %rk, "Product updated");
            Flash::success(format!("Product '{name}' updated successfully!"))
        }
        Err(e) => {
            tracing::error!(row_key = %rk, error = %e, "Error updating product");
            Flash::error("Unable to save changes. Please try again.")
        }
    };

    Ok(redirect_with_flash(&session, flash, "/products")
        .await?
        .into_response())
}

// =============================================================================
// Delete
// =============================================================================

/// Display the delete confirmation.
#[instrument(skip(state, _admin, page))]
pub async fn delete_page(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((pk, rk)): Path<(String, String)>,
    page: PageContext,
) -> Result<ProductDeleteTemplate> {
    let product = find_product(&state, &pk, &rk).await?;
    Ok(ProductDeleteTemplate { page, product })
}

/// Delete a product and its image.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path((pk, rk)): Path<(String, String)>,
) -> Result<Redirect> {
    let flash = delete_product_entry(state.storage(), &pk, &rk).await;
    redirect_with_flash(&session, flash, "/products").await
}

/// Delete the product stored under the route's keys and describe the outcome.
async fn delete_product_entry(storage: &dyn StorageService, pk: &str, rk: &str) -> Flash {
    let result = async {
        let name = storage
            .get_product(pk, rk)
            .await?
            .map_or_else(|| "Product".to_string(), |p| p.name);
        let deleted = storage.delete_product(pk, rk).await?;
        Ok::<_, StorageError>(deleted.then_some(name))
    }
    .await;

    match result {
        Ok(Some(name)) => {
            tracing::info!(partition_key = %pk, row_key = %rk, "Product deleted");
            Flash::success(format!("Product '{name}' deleted successfully!"))
        }
        Ok(None) => {
            tracing::warn!(partition_key = %pk, row_key = %rk, "Product to delete not found");
            Flash::error("Product not found.")
        }
        Err(e) => {
            tracing::error!(partition_key = %pk, row_key = %rk, error = %e, "Error deleting product");
            Flash::error("Error deleting product. Please try again.")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cloud_retail_storage::{MemoryBackend, Storage, StorageSettings};

    use super::*;

    fn values(name: &str, price: &str) -> ProductFormValues {
        ProductFormValues {
            name: name.to_string(),
            price: price.to_string(),
            ..ProductFormValues::default()
        }
    }

    #[test]
    fn test_validate_parses_price() {
        assert_eq!(values("Mug", "12.50").validate(), Ok(Decimal::new(1250, 2)));
        assert_eq!(values("Mug", "0").validate(), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(values("", "1").validate().is_err());
        assert!(values("Mug", "-1").validate().is_err());
        assert!(values("Mug", "abc").validate().is_err());
        assert!(values(&"x".repeat(101), "1").validate().is_err());
    }

    #[test]
    fn test_product_path_encodes_keys() {
        let product = ProductModel {
            row_key: "a b".to_string(),
            ..ProductModel::default()
        };
        assert_eq!(product_path(&product), "/products/Product/a%20b");
    }

    fn product(pk: &str, rk: &str, name: &str) -> ProductModel {
        ProductModel {
            partition_key: pk.to_string(),
            row_key: rk.to_string(),
            name: name.to_string(),
            ..ProductModel::default()
        }
    }

    #[tokio::test]
    async fn test_delete_uses_route_partition() {
        let storage = Storage::new(MemoryBackend::new(), StorageSettings::default());
        storage.add_product(product("Other", "p1", "Lamp"), None).await.unwrap();

        let flash = delete_product_entry(&storage, "Other", "p1").await;

        assert_eq!(flash, Flash::success("Product 'Lamp' deleted successfully!"));
        assert!(storage.get_product("Other", "p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_product_is_not_success() {
        let storage = Storage::new(MemoryBackend::new(), StorageSettings::default());
        storage.add_product(product("Other", "p1", "Lamp"), None).await.unwrap();

        let flash = delete_product_entry(&storage, PRODUCT_PARTITION, "p1").await;

        assert_eq!(flash.kind, crate::models::FlashKind::Error);
        assert!(storage.get_product("Other", "p1").await.unwrap().is_some());
    }
}
