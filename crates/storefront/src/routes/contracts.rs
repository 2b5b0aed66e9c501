//! Contract file management (admin).
//!
//! Every operation tries the functions app and falls back to the storage
//! file share.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use cloud_retail_core::{ContractFile, StorageService};

use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::Flash;
use crate::services::FunctionApiClient;
use crate::state::AppState;

use super::admin::contract_files;
use super::forms::MultipartForm;
use super::redirect_with_flash;

/// Multipart field carrying the contract.
const FILE_FIELD: &str = "file";

/// Contract listing page.
#[derive(Template, WebTemplate)]
#[template(path = "contracts/index.html")]
pub struct ContractsIndexTemplate {
    pub page: PageContext,
    pub files: Vec<ContractFile>,
}

/// Upload form page.
#[derive(Template, WebTemplate)]
#[template(path = "contracts/upload.html")]
pub struct ContractUploadTemplate {
    pub page: PageContext,
    pub error: Option<String>,
}

/// Strip any client-side directory from an uploaded file name.
fn base_file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}

/// `Content-Disposition` value for a download.
fn attachment_header(name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        name.replace(['"', '\\'], "_"),
        urlencoding::encode(name)
    )
}

/// Contract listing.
#[instrument(skip(state, _admin, page))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
) -> ContractsIndexTemplate {
    ContractsIndexTemplate {
        page,
        files: contract_files(&state).await,
    }
}

/// Contract listing as JSON; empty when both sources fail.
#[instrument(skip(state, _admin))]
pub async fn files(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Json<Vec<ContractFile>> {
    Json(contract_files(&state).await)
}

/// Display the upload form.
pub async fn upload_page(RequireAdmin(_admin): RequireAdmin, page: PageContext) -> impl IntoResponse {
    ContractUploadTemplate { page, error: None }
}

/// Upload a contract.
#[instrument(skip(state, session, admin, page, multipart), fields(admin_id = %admin.id))]
pub async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::collect(multipart).await?;

    let Some(file) = form.take_file(FILE_FIELD) else {
        return Ok(ContractUploadTemplate {
            page,
            error: Some("Please select a file to upload.".to_string()),
        }
        .into_response());
    };

    let name = base_file_name(&file.file_name).to_string();
    if name.is_empty() {
        return Ok(ContractUploadTemplate {
            page,
            error: Some("Please select a file to upload.".to_string()),
        }
        .into_response());
    }

    let uploaded = match state
        .functions()
        .upload_contract(&name, file.bytes.clone())
        .await
    {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(error = %e, "Function app upload unavailable, writing to storage");
            state
                .storage()
                .upload_contract(&name, file.bytes)
                .await
                .map_err(|e| e.to_string())
        }
    };

    match uploaded {
        Ok(()) => {
            tracing::info!(file = %name, "Contract uploaded");
            let flash = Flash::success(format!("Contract '{name}' uploaded successfully."));
            Ok(redirect_with_flash(&session, flash, "/contracts")
                .await?
                .into_response())
        }
        Err(e) => {
            tracing::error!(file = %name, error = %e, "Error uploading contract");
            Ok(ContractUploadTemplate {
                page,
                error: Some(format!("Error uploading file: {e}")),
            }
            .into_response())
        }
    }
}

/// Download a contract as an attachment.
#[instrument(skip(state, session, _admin))]
pub async fn download(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(file): Path<String>,
) -> Result<Response> {
    let bytes = fetch_contract(state.functions(), state.storage(), &file).await;

    let Some(bytes) = bytes else {
        return Ok(
            redirect_with_flash(&session, Flash::error("File not found."), "/contracts")
                .await?
                .into_response(),
        );
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, attachment_header(&file)),
        ],
        bytes,
    )
        .into_response())
}

/// Delete a contract.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(file): Path<String>,
) -> Result<Response> {
    let deleted = remove_contract(state.functions(), state.storage(), &file).await;

    let flash = if deleted {
        tracing::info!(file = %file, "Contract deleted");
        Flash::success(format!("Contract '{file}' deleted successfully."))
    } else {
        Flash::error("File not found or could not be deleted.")
    };

    Ok(redirect_with_flash(&session, flash, "/contracts")
        .await?
        .into_response())
}

/// Read a contract from the functions app, or from the share when the app
/// is unavailable or does not have it.
async fn fetch_contract(
    functions: &FunctionApiClient,
    storage: &dyn StorageService,
    file: &str,
) -> Option<Vec<u8>> {
    match functions.download_contract(file).await {
        Ok(Some(bytes)) => return Some(bytes),
        Ok(None) => tracing::debug!(file = %file, "Function app has no such contract, reading storage"),
        Err(e) => tracing::debug!(error = %e, "Function app download unavailable, reading storage"),
    }
    storage.download_contract(file).await.unwrap_or_else(|e| {
        tracing::error!(file = %file, error = %e, "Error downloading contract");
        None
    })
}

/// Delete a contract through the functions app, or from the share when the
/// app is unavailable or did not delete it.
async fn remove_contract(
    functions: &FunctionApiClient,
    storage: &dyn StorageService,
    file: &str,
) -> bool {
    match functions.delete_contract(file).await {
        Ok(true) => return true,
        Ok(false) => tracing::debug!(file = %file, "Function app did not delete contract, using storage"),
        Err(e) => tracing::debug!(error = %e, "Function app delete unavailable, using storage"),
    }
    storage.delete_contract(file).await.unwrap_or_else(|e| {
        tracing::error!(file = %file, error = %e, "Error deleting contract");
        false
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, http::StatusCode};
    use cloud_retail_storage::{MemoryBackend, Storage, StorageSettings};
    use url::Url;

    use super::*;

    /// A functions app that answers 404 to everything.
    async fn empty_function_app() -> FunctionApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(|| async { StatusCode::NOT_FOUND });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        FunctionApiClient::new(Some(Url::parse(&format!("http://{addr}/")).unwrap()), None).unwrap()
    }

    async fn storage_with_lease() -> Storage<MemoryBackend> {
        let storage = Storage::new(MemoryBackend::new(), StorageSettings::default());
        storage
            .upload_contract("lease.pdf", b"signed".to_vec())
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_download_reads_share_when_app_has_no_file() {
        let functions = empty_function_app().await;
        let storage = storage_with_lease().await;

        let bytes = fetch_contract(&functions, &storage, "lease.pdf").await;

        assert_eq!(bytes.as_deref(), Some(b"signed".as_slice()));
        assert!(fetch_contract(&functions, &storage, "missing.pdf").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_uses_share_when_app_has_no_file() {
        let functions = empty_function_app().await;
        let storage = storage_with_lease().await;

        assert!(remove_contract(&functions, &storage, "lease.pdf").await);
        assert!(storage.download_contract("lease.pdf").await.unwrap().is_none());
        assert!(!remove_contract(&functions, &storage, "lease.pdf").await);
    }

    #[tokio::test]
    async fn test_unconfigured_app_falls_back_to_share() {
        let functions = FunctionApiClient::new(None, None).unwrap();
        let storage = storage_with_lease().await;

        assert!(fetch_contract(&functions, &storage, "lease.pdf").await.is_some());
        assert!(remove_contract(&functions, &storage, "lease.pdf").await);
    }

    #[test]
    fn test_base_file_name_strips_directories() {
        assert_eq!(base_file_name("lease.pdf"), "lease.pdf");
        assert_eq!(base_file_name("C:\\docs\\lease.pdf"), "lease.pdf");
        assert_eq!(base_file_name("docs/2024/lease.pdf"), "lease.pdf");
    }

    #[test]
    fn test_attachment_header_quotes_and_encodes() {
        assert_eq!(
            attachment_header("a b.pdf"),
            "attachment; filename=\"a b.pdf\"; filename*=UTF-8''a%20b.pdf"
        );
        assert!(attachment_header("x\"y.txt").starts_with("attachment; filename=\"x_y.txt\""));
    }
}
