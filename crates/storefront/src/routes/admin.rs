//! Admin dashboard and order management.
//!
//! Queue and contract sections ask the functions app first and fall back
//! to reading storage directly when it is unavailable or returns nothing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::instrument;

use cloud_retail_core::{ContractFile, OrderId, OrderMessage, OrderStatus};

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::OrderWithUser;
use crate::state::AppState;

/// Numbers and lists shown on the admin dashboard.
#[derive(Debug, Default)]
pub struct AdminDashboard {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_users: i64,
    pub product_count: usize,
    pub queued_orders: Vec<OrderMessage>,
    pub contract_files: Vec<ContractFile>,
}

/// Admin dashboard page.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub page: PageContext,
    pub dashboard: AdminDashboard,
}

/// All-orders page.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderWithUser>,
}

/// Status update form data.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateForm {
    pub order_id: i32,
    pub new_status: String,
}

/// Gather the dashboard.
///
/// Relational counts are required; product, queue and contract sections
/// are logged and left empty when their source fails.
///
/// # Errors
///
/// Returns `AppError::Database` if a relational count fails.
pub async fn load_dashboard(state: &AppState) -> Result<AdminDashboard> {
    let orders = OrderRepository::new(state.pool());
    let total_orders = orders.count(None, None).await?;
    let pending_orders = orders.count(None, Some(OrderStatus::Pending)).await?;
    let total_users = UserRepository::new(state.pool()).count().await?;

    let product_count = match state.storage().list_products().await {
        Ok(products) => products.len(),
        Err(e) => {
            tracing::warn!(error = %e, "Unable to load product count for admin dashboard");
            0
        }
    };

    Ok(AdminDashboard {
        total_orders,
        pending_orders,
        total_users,
        product_count,
        queued_orders: queued_orders(state).await,
        contract_files: contract_files(state).await,
    })
}

/// Queued orders from the functions app, else a storage peek.
pub async fn queued_orders(state: &AppState) -> Vec<OrderMessage> {
    match state.functions().get_queue_messages().await {
        Ok(messages) if !messages.is_empty() => return messages,
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "Function app queue unavailable, reading storage"),
    }

    state.storage().peek_orders().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Unable to load queue information for admin dashboard");
        Vec::new()
    })
}

/// Contract files from the functions app, else the storage share.
pub async fn contract_files(state: &AppState) -> Vec<ContractFile> {
    match state.functions().get_contract_files().await {
        Ok(files) if !files.is_empty() => return files,
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "Function app contracts unavailable, reading storage"),
    }

    state.storage().list_contracts().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Unable to load contract files");
        Vec::new()
    })
}

/// Admin dashboard handler.
#[instrument(skip(state, _admin, page))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<AdminDashboardTemplate> {
    Ok(AdminDashboardTemplate {
        page,
        dashboard: load_dashboard(&state).await?,
    })
}

/// Every order with its owner, newest first.
#[instrument(skip(state, _admin, page))]
pub async fn orders(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<AdminOrdersTemplate> {
    let orders = OrderRepository::new(state.pool())
        .list_all_with_users()
        .await?;
    Ok(AdminOrdersTemplate { page, orders })
}

/// Move an order to `Processed` or `Cancelled`.
///
/// Unknown order IDs are ignored.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_order_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Form(form): Form<StatusUpdateForm>,
) -> Result<Redirect> {
    let status = OrderStatus::parse_admin_update(&form.new_status)
        .ok_or_else(|| AppError::BadRequest("Invalid status update.".to_string()))?;

    let order_id = OrderId::new(form.order_id);
    let updated = OrderRepository::new(state.pool())
        .update_status(order_id, status)
        .await?;

    if updated {
        tracing::info!(order_id = %order_id, status = %status, "Order status updated");
    } else {
        tracing::warn!(order_id = %order_id, "Status update for unknown order ignored");
    }

    Ok(Redirect::to("/admin/orders"))
}
