//! Account route handlers: login, registration, logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cloud_retail_core::{CustomerModel, UserRole, split_full_name};

use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{PageContext, clear_current_user, is_local_url, set_current_user};
use crate::models::{CurrentUser, Flash, User};
use crate::services::{AuthError, AuthService, FieldErrors, Registration, RegistrationInput};
use crate::state::AppState;

use super::redirect_with_flash;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default, rename = "returnUrl")]
    pub return_url: Option<String>,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub confirm_password: String,
    pub role: String,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub username: String,
    pub return_url: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: RegisterForm,
    pub errors: FieldErrors,
    pub allow_admin: bool,
}

/// Access denied page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/access_denied.html")]
pub struct AccessDeniedTemplate {
    pub page: PageContext,
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext, Query(query): Query<LoginQuery>) -> impl IntoResponse {
    LoginTemplate {
        page,
        error: None,
        username: String::new(),
        return_url: query.return_url.unwrap_or_default(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let user = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed");
            return Ok(LoginTemplate {
                page,
                error: Some("Invalid username or password.".to_string()),
                username: form.username,
                return_url: form.return_url.unwrap_or_default(),
            }
            .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let current = sign_in(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    let target = match form.return_url.as_deref() {
        _ if current.is_admin() => current.home_path().to_string(),
        Some(url) if is_local_url(url) => url.to_string(),
        _ => current.home_path().to_string(),
    };

    let flash = Flash::success(format!("Welcome back, {}!", user.username));
    Ok(redirect_with_flash(&session, flash, &target)
        .await?
        .into_response())
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
pub async fn register_page(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        page,
        form: RegisterForm {
            role: UserRole::Customer.to_string(),
            ..RegisterForm::default()
        },
        errors: FieldErrors::default(),
        allow_admin: state.config().allow_admin_registration,
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, page, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let allow_admin = state.config().allow_admin_registration;
    let input = RegistrationInput {
        username: &form.username,
        email: &form.email,
        full_name: &form.full_name,
        password: &form.password,
        confirm_password: &form.confirm_password,
        role: &form.role,
    };

    let registration = match Registration::validate(&input, allow_admin) {
        Ok(registration) => registration,
        Err(errors) => return Ok(register_form_with_errors(page, form, errors, allow_admin)),
    };

    let user = match AuthService::new(state.pool()).register(&registration).await {
        Ok(user) => user,
        Err(AuthError::UserAlreadyExists) => {
            let mut errors = FieldErrors::default();
            errors.add("username", "This username is already in use.");
            return Ok(register_form_with_errors(page, form, errors, allow_admin));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    if user.role == UserRole::Customer {
        add_customer_record(&state, &user, registration.full_name.as_deref()).await;
    }

    let current = sign_in(&session, &user).await?;
    let flash = Flash::success(format!(
        "Account created successfully! Welcome, {}!",
        user.username
    ));
    Ok(redirect_with_flash(&session, flash, current.home_path())
        .await?
        .into_response())
}

fn register_form_with_errors(
    page: PageContext,
    mut form: RegisterForm,
    errors: FieldErrors,
    allow_admin: bool,
) -> Response {
    form.password.clear();
    form.confirm_password.clear();
    RegisterTemplate {
        page,
        form,
        errors,
        allow_admin,
    }
    .into_response()
}

/// Mirror a new customer account into the customers table.
///
/// Failures are logged; the account itself is already created.
async fn add_customer_record(state: &AppState, user: &User, full_name: Option<&str>) {
    let (first_name, last_name) = split_full_name(full_name.unwrap_or(&user.username));
    let customer = CustomerModel {
        row_key: user.id.to_string(),
        first_name,
        last_name,
        email: user.email.clone().unwrap_or_default(),
        phone: String::new(),
        ..CustomerModel::default()
    };

    if let Err(e) = state.storage().add_customer(customer).await {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to add customer record for new account");
    }
}

// =============================================================================
// Logout / Access Denied
// =============================================================================

/// Handle logout.
#[instrument(skip(session, page))]
pub async fn logout(session: Session, page: PageContext) -> Result<Redirect> {
    let user = page.user;
    clear_current_user(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();

    let message = match &user {
        Some(user) => {
            tracing::info!(user_id = %user.id, "User logged out");
            format!(
                "You have been logged out successfully. Goodbye, {}!",
                user.username
            )
        }
        None => "You have been logged out successfully.".to_string(),
    };

    redirect_with_flash(&session, Flash::success(message), "/").await
}

/// Display the access denied page.
pub async fn access_denied(page: PageContext) -> impl IntoResponse {
    AccessDeniedTemplate { page }
}

/// Store the user in the session and tag Sentry with them.
async fn sign_in(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, user.email.as_deref());
    add_breadcrumb("auth", "Signed in", Some(&[("role", &user.role.to_string())]));
    Ok(current)
}
