//! Cart and checkout route handlers.
//!
//! Cart lines live in `retail.cart_item` and reference products by row key.
//! Every action is scoped to the signed-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cloud_retail_core::{CartItemId, PRODUCT_PARTITION, format_money};

use crate::db::{CartItemRepository, MAX_LINE_QUANTITY, OrderRepository, RepositoryError};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::{CurrentUser, Flash};
use crate::services::{CartLine, load_cart_lines, order_message, price_cart};
use crate::state::AppState;

use super::redirect_with_flash;

// =============================================================================
// Form Types
// =============================================================================

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    #[serde(default)]
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Whether a requested line quantity is within `1..=MAX_LINE_QUANTITY`.
fn valid_quantity(quantity: i32) -> bool {
    (1..=MAX_LINE_QUANTITY).contains(&quantity)
}

/// Remove-line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub cart_item_id: i32,
}

/// Update-quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub cart_item_id: i32,
    pub new_quantity: i32,
}

// =============================================================================
// Views
// =============================================================================

/// One cart line for the template.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub image_url: Option<String>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.item.id,
            product_id: line.item.product_id.clone(),
            name: line.product_name().to_string(),
            unit_price: line.unit_price(),
            quantity: line.item.quantity,
            line_total: line.line_total(),
            image_url: line
                .product
                .as_ref()
                .and_then(|p| p.image_blob_path.clone()),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/index.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub lines: Vec<CartLineView>,
    pub total: Decimal,
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart with product data joined in.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let items = CartItemRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    let lines = load_cart_lines(state.storage(), items).await?;

    let views: Vec<CartLineView> = lines.iter().map(CartLineView::from).collect();
    let total = views.iter().map(|line| line.line_total).sum();

    Ok(CartTemplate {
        page,
        lines: views,
        total,
    })
}

/// Add a product to the cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddForm>,
) -> Result<Redirect> {
    add_to_cart_and_redirect(&state, &session, &user, form.product_id.trim(), form.quantity).await
}

/// Validate, add and flash the outcome.
///
/// Invalid input and unknown products go back to `/products`; a successful
/// add goes to the cart.
///
/// # Errors
///
/// Returns `AppError` if storage, the database or the session fails.
pub async fn add_to_cart_and_redirect(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    product_id: &str,
    quantity: i32,
) -> Result<Redirect> {
    if product_id.is_empty() || !valid_quantity(quantity) {
        return redirect_with_flash(
            session,
            Flash::error("Invalid product or quantity."),
            "/products",
        )
        .await;
    }

    let Some(product) = state
        .storage()
        .get_product(PRODUCT_PARTITION, product_id)
        .await?
    else {
        return redirect_with_flash(session, Flash::error("Product not found."), "/products")
            .await;
    };

    let item = CartItemRepository::new(state.pool())
        .add(user.id, product_id, quantity)
        .await?;
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id)]));

    let message = if item.quantity > quantity {
        format!("Updated quantity of {} in your cart.", product.name)
    } else {
        format!("{} added to cart successfully!", product.name)
    };

    redirect_with_flash(session, Flash::success(message), "/cart").await
}

/// Remove a cart line.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveForm>,
) -> Result<Redirect> {
    let carts = CartItemRepository::new(state.pool());
    let id = CartItemId::new(form.cart_item_id);

    let Some(item) = carts.get_for_user(user.id, id).await? else {
        return redirect_with_flash(&session, Flash::error("Cart item not found."), "/cart").await;
    };

    let name = product_name(&state, &item.product_id).await;
    carts.remove(user.id, id).await?;

    let message = format!("{} removed from cart.", name.as_deref().unwrap_or("Item"));
    redirect_with_flash(&session, Flash::success(message), "/cart").await
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateForm>,
) -> Result<Redirect> {
    if form.new_quantity <= 0 {
        return remove(
            RequireAuth(user),
            State(state),
            session,
            Form(RemoveForm {
                cart_item_id: form.cart_item_id,
            }),
        )
        .await;
    }
    if !valid_quantity(form.new_quantity) {
        return redirect_with_flash(&session, Flash::error("Invalid quantity."), "/cart").await;
    }

    let carts = CartItemRepository::new(state.pool());
    let id = CartItemId::new(form.cart_item_id);

    let Some(item) = carts.get_for_user(user.id, id).await? else {
        return redirect_with_flash(&session, Flash::error("Cart item not found."), "/cart").await;
    };

    match carts.set_quantity(user.id, id, form.new_quantity).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => {
            return redirect_with_flash(&session, Flash::error("Cart item not found."), "/cart")
                .await;
        }
        Err(e) => return Err(e.into()),
    }

    let name = product_name(&state, &item.product_id).await;
    let message = format!(
        "Updated quantity of {} to {}.",
        name.as_deref().unwrap_or("item"),
        form.new_quantity
    );
    redirect_with_flash(&session, Flash::success(message), "/cart").await
}

/// Place an order from the cart.
///
/// The order insert and cart clear commit together; the queue message is
/// published afterwards and only when at least one line was priced.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn checkout(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect> {
    let items = CartItemRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    if items.is_empty() {
        return redirect_with_flash(
            &session,
            Flash::warning("Your cart is empty. Add items before checkout."),
            "/cart",
        )
        .await;
    }

    let lines = load_cart_lines(state.storage(), items).await?;
    let priced = price_cart(&lines);
    let total = priced.total;

    let order = OrderRepository::new(state.pool())
        .place_and_clear_cart(user.id, total)
        .await?;
    tracing::info!(order_id = %order.id, total = %total, "Order placed");
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", &order.id.to_string())]));

    if let Some(message) = order_message(&order, priced) {
        if let Err(e) = state.storage().enqueue_order(&message).await {
            tracing::error!(order_id = %order.id, error = %e, "Failed to enqueue order");
        }
    }

    let message = format!(
        "Order #{} placed successfully! Total: {}. Your order is being processed.",
        order.id,
        format_money(total)
    );
    redirect_with_flash(&session, Flash::success(message), "/orders").await
}

/// Product name for a flash message; lookup failures read as unknown.
async fn product_name(state: &AppState, product_id: &str) -> Option<String> {
    match state
        .storage()
        .get_product(PRODUCT_PARTITION, product_id)
        .await
    {
        Ok(product) => product.map(|p| p.name),
        Err(e) => {
            tracing::warn!(product_id, error = %e, "Product lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_quantity_bounds() {
        assert!(valid_quantity(1));
        assert!(valid_quantity(MAX_LINE_QUANTITY));
        assert!(!valid_quantity(0));
        assert!(!valid_quantity(-3));
        assert!(!valid_quantity(MAX_LINE_QUANTITY + 1));
        assert!(!valid_quantity(i32::MAX));
    }
}
