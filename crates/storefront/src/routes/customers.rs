//! Customer management (admin).
//!
//! Customers are table entities in the `Customer` partition; the partition
//! key is forced on every write. Deletes use the keys in the URL.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cloud_retail_core::{CUSTOMER_PARTITION, CustomerModel, Email, StorageError, StorageService};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::Flash;
use crate::state::AppState;

use super::redirect_with_flash;

const MAX_NAME_LENGTH: usize = 50;

/// Create/edit form data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomerForm {
    pub row_key: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl From<&CustomerModel> for CustomerForm {
    fn from(customer: &CustomerModel) -> Self {
        Self {
            row_key: customer.row_key.clone(),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
        }
    }
}

impl CustomerForm {
    /// First failed rule, if any.
    fn validate(&self) -> Option<String> {
        for (label, value) in [
            ("First Name", &self.first_name),
            ("Last Name", &self.last_name),
        ] {
            if value.trim().is_empty() {
                return Some(format!("The {label} field is required."));
            }
            if value.trim().chars().count() > MAX_NAME_LENGTH {
                return Some(format!(
                    "{label} must be at most {MAX_NAME_LENGTH} characters."
                ));
            }
        }
        if Email::parse(&self.email).is_err() {
            return Some("The Email field is not a valid e-mail address.".to_string());
        }
        None
    }

    /// Apply the form to `customer`, keeping its keys and creation time.
    fn apply(self, customer: CustomerModel) -> CustomerModel {
        CustomerModel {
            partition_key: CUSTOMER_PARTITION.to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            ..customer
        }
    }
}

/// Customer listing page.
#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub page: PageContext,
    pub customers: Vec<CustomerModel>,
}

/// Customer details page.
#[derive(Template, WebTemplate)]
#[template(path = "customers/details.html")]
pub struct CustomerDetailsTemplate {
    pub page: PageContext,
    pub customer: CustomerModel,
}

/// Create/edit form page.
#[derive(Template, WebTemplate)]
#[template(path = "customers/form.html")]
pub struct CustomerFormTemplate {
    pub page: PageContext,
    pub title: &'static str,
    pub action: String,
    pub form: CustomerForm,
    pub error: Option<String>,
}

/// Delete confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "customers/delete.html")]
pub struct CustomerDeleteTemplate {
    pub page: PageContext,
    pub customer: CustomerModel,
}

fn customer_path(customer: &CustomerModel) -> String {
    format!(
        "/customers/{}/{}",
        urlencoding::encode(&customer.partition_key),
        urlencoding::encode(&customer.row_key)
    )
}

async fn find_customer(state: &AppState, pk: &str, rk: &str) -> Result<CustomerModel> {
    if pk.trim().is_empty() || rk.trim().is_empty() {
        return Err(AppError::NotFound("customer".to_string()));
    }
    state
        .storage()
        .get_customer(pk, rk)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {pk}/{rk}")))
}

/// Customer listing, newest first.
#[instrument(skip(state, _admin, page))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<CustomersIndexTemplate> {
    let customers = state.storage().list_customers().await?;
    Ok(CustomersIndexTemplate { page, customers })
}

/// Customer details.
#[instrument(skip(state, _admin, page))]
pub async fn details(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((pk, rk)): Path<(String, String)>,
    page: PageContext,
) -> Result<CustomerDetailsTemplate> {
    let customer = find_customer(&state, &pk, &rk).await?;
    Ok(CustomerDetailsTemplate { page, customer })
}

/// Display the create form.
pub async fn create_page(RequireAdmin(_admin): RequireAdmin, page: PageContext) -> impl IntoResponse {
    CustomerFormTemplate {
        page,
        title: "Create Customer",
        action: "/customers/create".to_string(),
        form: CustomerForm::default(),
        error: None,
    }
}

/// Create a customer.
#[instrument(skip(state, session, admin, page, form), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<CustomerForm>,
) -> Result<Response> {
    if let Some(error) = form.validate() {
        return Ok(CustomerFormTemplate {
            page,
            title: "Create Customer",
            action: "/customers/create".to_string(),
            form,
            error: Some(format!("Please correct the errors and try again. {error}")),
        }
        .into_response());
    }

    let created = state
        .storage()
        .add_customer(form.apply(CustomerModel::default()))
        .await?;
    tracing::info!(row_key = %created.row_key, "Customer created");

    let flash = Flash::success(format!(
        "Customer '{} {}' created successfully!",
        created.first_name, created.last_name
    ));
    Ok(redirect_with_flash(&session, flash, "/customers")
        .await?
        .into_response())
}

/// Display the edit form.
#[instrument(skip(state, _admin, page))]
pub async fn edit_page(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((pk, rk)): Path<(String, String)>,
    page: PageContext,
) -> Result<CustomerFormTemplate> {
    let customer = find_customer(&state, &pk, &rk).await?;
    Ok(CustomerFormTemplate {
        page,
        title: "Edit Customer",
        action: format!("{}/edit", customer_path(&customer)),
        form: CustomerForm::from(&customer),
        error: None,
    })
}

/// Update a customer.
#[instrument(skip(state, session, admin, page, form), fields(admin_id = %admin.id))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path((pk, rk)): Path<(String, String)>,
    page: PageContext,
    Form(form): Form<CustomerForm>,
) -> Result<Response> {
    // The form must target the customer in the URL
    if form.row_key != rk {
        return Err(AppError::NotFound(format!("customer {pk}/{rk}")));
    }

    let existing = find_customer(&state, &pk, &rk).await?;

    if let Some(error) = form.validate() {
        return Ok(CustomerFormTemplate {
            page,
            title: "Edit Customer",
            action: format!("{}/edit", customer_path(&existing)),
            form,
            error: Some(format!("Please correct the errors and try again. {error}")),
        }
        .into_response());
    }

    let flash = match state.storage().update_customer(form.apply(existing)).await {
        Ok(customer) => {
            tracing::info!(row_key = %rk, "Customer updated");
            Flash::success(format!(
                "Customer '{} {}' updated successfully!",
                customer.first_name, customer.last_name
            ))
        }
        Err(e) => {
            tracing::error!(row_key = %rk, error = %e, "Error updating customer");
            Flash::error("Unable to save changes. Please try again.")
        }
    };

    Ok(redirect_with_flash(&session, flash, "/customers")
        .await?
        .into_response())
}

/// Display the delete confirmation.
#[instrument(skip(state, _admin, page))]
pub async fn delete_page(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((pk, rk)): Path<(String, String)>,
    page: PageContext,
) -> Result<CustomerDeleteTemplate> {
    let customer = find_customer(&state, &pk, &rk).await?;
    Ok(CustomerDeleteTemplate { page, customer })
}

/// Delete a customer.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path((pk, rk)): Path<(String, String)>,
) -> Result<Redirect> {
    let flash = delete_customer_entry(state.storage(), &pk, &rk).await;
    redirect_with_flash(&session, flash, "/customers").await
}

async fn delete_customer_entry(storage: &dyn StorageService, pk: &str, rk: &str) -> Flash {
    let result = async {
        let name = storage
            .get_customer(pk, rk)
            .await?
            .map_or_else(|| "Customer".to_string(), |c| c.full_name());
        let deleted = storage.delete_customer(pk, rk).await?;
        Ok::<_, StorageError>(deleted.then_some(name))
    }
    .await;

    match result {
        Ok(Some(name)) => {
            tracing::info!(partition_key = %pk, row_key = %rk, "Customer deleted");
            Flash::success(format!("Customer '{name}' deleted successfully!"))
        }
        Ok(None) => {
            tracing::warn!(partition_key = %pk, row_key = %rk, "Customer to delete not found");
            Flash::error("Customer not found.")
        }
        Err(e) => {
            tracing::error!(partition_key = %pk, row_key = %rk, error = %e, "Error deleting customer");
            Flash::error("Error deleting customer. Please try again.")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cloud_retail_storage::{MemoryBackend, Storage, StorageSettings};

    use super::*;

    fn form() -> CustomerForm {
        CustomerForm {
            row_key: "c-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: String::new(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_form() {
        assert_eq!(form().validate(), None);
    }

    #[test]
    fn test_validate_requires_names_and_email() {
        let missing_first = CustomerForm {
            first_name: " ".to_string(),
            ..form()
        };
        assert_eq!(
            missing_first.validate().as_deref(),
            Some("The First Name field is required.")
        );

        let bad_email = CustomerForm {
            email: "ada".to_string(),
            ..form()
        };
        assert!(bad_email.validate().is_some());
    }

    #[test]
    fn test_apply_forces_partition_and_keeps_keys() {
        let existing = CustomerModel {
            partition_key: "Elsewhere".to_string(),
            row_key: "c-1".to_string(),
            ..CustomerModel::default()
        };
        let created_at = existing.created_at;

        let updated = form().apply(existing);
        assert_eq!(updated.partition_key, CUSTOMER_PARTITION);
        assert_eq!(updated.row_key, "c-1");
        assert_eq!(updated.created_at, created_at);
        assert_eq!(updated.full_name(), "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_delete_uses_route_partition() {
        let storage = Storage::new(MemoryBackend::new(), StorageSettings::default());
        let customer = CustomerModel {
            partition_key: "Wholesale".to_string(),
            row_key: "c-9".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            ..CustomerModel::default()
        };
        storage.add_customer(customer).await.unwrap();

        let flash = delete_customer_entry(&storage, "Wholesale", "c-9").await;
        assert_eq!(flash, Flash::success("Customer 'Grace Hopper' deleted successfully!"));
        assert!(storage.get_customer("Wholesale", "c-9").await.unwrap().is_none());

        let flash = delete_customer_entry(&storage, "Wholesale", "c-9").await;
        assert_eq!(flash, Flash::error("Customer not found."));
    }
}
