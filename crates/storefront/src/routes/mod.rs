//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                - Landing page (signed-in users go to /portal)
//! GET  /portal                          - Role dispatch to the right home page
//! GET  /home/customer                   - Customer dashboard
//! GET  /home/admin                      - Admin dashboard
//! GET  /images/{name}                   - Product image blobs
//!
//! # Account
//! GET  /account/login                   - Login page (?returnUrl=)
//! POST /account/login                   - Login action (rate limited)
//! GET  /account/register                - Register page
//! POST /account/register                - Register action (rate limited)
//! POST /account/logout                  - Logout action
//! GET  /account/access-denied           - Shown to non-admins on admin pages
//!
//! # Products (mutations require admin)
//! GET  /products                        - Product listing
//! GET  /products/create                 - Create form
//! POST /products/create                 - Create (multipart, optional image_file)
//! POST /products/add-to-cart            - Add one unit to the cart (auth)
//! GET  /products/{pk}/{rk}              - Product details
//! GET  /products/{pk}/{rk}/edit         - Edit form
//! POST /products/{pk}/{rk}/edit         - Update (multipart, optional image_file)
//! GET  /products/{pk}/{rk}/delete       - Delete confirmation
//! POST /products/{pk}/{rk}/delete       - Delete
//!
//! # Customers (admin)
//! GET  /customers                       - Customer listing
//! GET  /customers/create                - Create form
//! POST /customers/create                - Create
//! GET  /customers/{pk}/{rk}             - Customer details
//! GET  /customers/{pk}/{rk}/edit        - Edit form
//! POST /customers/{pk}/{rk}/edit        - Update
//! GET  /customers/{pk}/{rk}/delete      - Delete confirmation
//! POST /customers/{pk}/{rk}/delete      - Delete
//!
//! # Cart (auth)
//! GET  /cart                            - Cart page (alias /cart/view)
//! POST /cart/add                        - Add product
//! POST /cart/update                     - Set line quantity (<= 0 removes)
//! POST /cart/remove                     - Remove line
//! POST /cart/checkout                   - Place order and enqueue it
//!
//! # Orders (auth)
//! GET  /orders                          - Current user's orders
//!
//! # Admin (admin)
//! GET  /admin                           - Dashboard
//! GET  /admin/orders                    - All orders
//! POST /admin/orders/status             - Set Processed/Cancelled
//!
//! # Contracts (admin)
//! GET  /contracts                       - Contract files
//! GET  /contracts/files                 - Contract files (JSON)
//! GET  /contracts/upload                - Upload form
//! POST /contracts/upload                - Upload (multipart `file`)
//! GET  /contracts/{file}/download       - Download attachment
//! POST /contracts/{file}/delete         - Delete
//! ```

pub mod account;
pub mod admin;
pub mod cart;
pub mod contracts;
pub mod customers;
pub mod forms;
pub mod home;
pub mod images;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::{auth_rate_limiter, set_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Upper bound for product image and contract uploads.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Store `flash` and redirect to `to`.
///
/// # Errors
///
/// Returns `AppError::Session` if the flash cannot be stored.
pub async fn redirect_with_flash(session: &Session, flash: Flash, to: &str) -> Result<Redirect> {
    set_flash(session, flash).await?;
    Ok(Redirect::to(to))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(account::login))
        .route("/register", post(account::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(account::login_page))
        .route("/register", get(account::register_page))
        .route("/logout", post(account::logout))
        .route("/access-denied", get(account::access_denied))
        .merge(limited)
}

/// Create the home routes router.
pub fn home_routes() -> Router<AppState> {
    Router::new()
        .route("/customer", get(home::customer_home))
        .route("/admin", get(home::admin_home))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/create", get(products::create_page).post(products::create))
        .route("/add-to-cart", post(products::add_to_cart))
        .route("/{pk}/{rk}", get(products::details))
        .route("/{pk}/{rk}/edit", get(products::edit_page).post(products::edit))
        .route(
            "/{pk}/{rk}/delete",
            get(products::delete_page).post(products::delete),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::index))
        .route("/create", get(customers::create_page).post(customers::create))
        .route("/{pk}/{rk}", get(customers::details))
        .route("/{pk}/{rk}/edit", get(customers::edit_page).post(customers::edit))
        .route(
            "/{pk}/{rk}/delete",
            get(customers::delete_page).post(customers::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/view", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/orders", get(admin::orders))
        .route("/orders/status", post(admin::update_order_status))
}

/// Create the contract routes router.
pub fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(contracts::index))
        .route("/files", get(contracts::files))
        .route("/upload", get(contracts::upload_page).post(contracts::upload))
        .route("/{file}/download", get(contracts::download))
        .route("/{file}/delete", post(contracts::delete))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/portal", get(home::portal))
        .nest("/home", home_routes())
        .nest("/account", account_routes())
        .nest("/products", product_routes())
        .nest("/customers", customer_routes())
        .nest("/cart", cart_routes())
        .route("/orders", get(orders::index))
        .nest("/admin", admin_routes())
        .nest("/contracts", contract_routes())
        .route("/images/{name}", get(images::show))
}
