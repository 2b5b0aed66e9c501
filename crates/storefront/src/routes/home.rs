//! Landing page and role-specific home pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use cloud_retail_core::ProductModel;

use crate::db::{CartItemRepository, OrderRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext, RequireAdmin, RequireAuth};
use crate::state::AppState;

use super::admin::{AdminDashboardTemplate, load_dashboard};

/// Number of products featured on the customer home page.
const FEATURED_PRODUCT_COUNT: usize = 3;

/// Anonymous landing page.
#[derive(Template, WebTemplate)]
#[template(path = "home/index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
}

/// Customer home page.
#[derive(Template, WebTemplate)]
#[template(path = "home/customer.html")]
pub struct CustomerHomeTemplate {
    pub page: PageContext,
    pub order_count: i64,
    pub cart_items: i64,
    pub featured_products: Vec<ProductModel>,
}

/// Landing page; signed-in users go straight to their portal.
pub async fn index(OptionalAuth(user): OptionalAuth, page: PageContext) -> Response {
    if user.is_some() {
        return Redirect::to("/portal").into_response();
    }
    IndexTemplate { page }.into_response()
}

/// Send the user to the home page for their role.
pub async fn portal(RequireAuth(user): RequireAuth) -> Redirect {
    Redirect::to(user.home_path())
}

/// Customer dashboard: order and cart counts plus the newest products.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn customer_home(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let order_count = OrderRepository::new(state.pool())
        .count(Some(user.id), None)
        .await?;
    let cart_items = CartItemRepository::new(state.pool())
        .count_for_user(user.id)
        .await?;

    let featured_products = match state.storage().list_products().await {
        Ok(mut products) => {
            products.truncate(FEATURED_PRODUCT_COUNT);
            products
        }
        Err(e) => {
            tracing::warn!(error = %e, "Unable to load featured products for customer dashboard");
            Vec::new()
        }
    };

    Ok(CustomerHomeTemplate {
        page,
        order_count,
        cart_items,
        featured_products,
    })
}

/// Admin home page; same dashboard as `/admin`.
#[instrument(skip(state, _admin, page))]
pub async fn admin_home(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<AdminDashboardTemplate> {
    Ok(AdminDashboardTemplate {
        page,
        dashboard: load_dashboard(&state).await?,
    })
}
