//! `/api/contracts`: the contracts file share.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::instrument;

use cloud_retail_core::ContractFile;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Upper bound for contract uploads.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Multipart field carrying the contract.
const FILE_FIELD: &str = "file";

/// Build the contracts router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contracts", get(list).post(upload))
        .route("/contracts/{file}", get(download).delete(delete))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Contract files sorted by name.
#[instrument(skip(state))]
async fn list(State(state): State<AppState>) -> Result<Json<Vec<ContractFile>>> {
    Ok(Json(state.storage().list_contracts().await?))
}

/// Upload the multipart `file` field, overwriting a file of the same name.
#[instrument(skip(state, multipart))]
async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<ContractFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        // Browsers may send the client-side path
        let name = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&file_name)
            .trim()
            .to_owned();
        if name.is_empty() {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        state.storage().upload_contract(&name, bytes.to_vec()).await?;
        tracing::info!(file = %name, size, "Contract uploaded");

        return Ok(Json(ContractFile { name, size }));
    }

    Err(AppError::BadRequest("No file uploaded.".to_string()))
}

/// Download a contract as an attachment.
#[instrument(skip(state))]
async fn download(State(state): State<AppState>, Path(file): Path<String>) -> Result<Response> {
    let bytes = state
        .storage()
        .download_contract(&file)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("contract {file}")))?;

    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&file)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Delete a contract.
#[instrument(skip(state))]
async fn delete(State(state): State<AppState>, Path(file): Path<String>) -> Result<StatusCode> {
    if !state.storage().delete_contract(&file).await? {
        return Err(AppError::NotFound(format!("contract {file}")));
    }
    tracing::info!(file = %file, "Contract deleted");
    Ok(StatusCode::OK)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};

    use super::super::test_support::*;

    const BOUNDARY: &str = "contract-boundary";

    fn multipart_request(field: &str, file_name: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             {contents}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/contracts")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_list_download_delete() {
        let app = app();

        let response = send(&app, multipart_request("file", "lease.pdf", "%PDF-1.7")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let uploaded = body_json(response).await;
        assert_eq!(uploaded["name"], "lease.pdf");
        assert_eq!(uploaded["size"], 8);

        let response = send(&app, empty_request("GET", "/api/contracts")).await;
        let files = body_json(response).await;
        assert_eq!(files.as_array().unwrap().len(), 1);
        assert_eq!(files[0]["name"], "lease.pdf");

        let response = send(&app, empty_request("GET", "/api/contracts/lease.pdf")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert_eq!(body_text(response).await, "%PDF-1.7");

        let response = send(&app, empty_request("DELETE", "/api/contracts/lease.pdf")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, empty_request("DELETE", "/api/contracts/lease.pdf")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, empty_request("GET", "/api/contracts/lease.pdf")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let app = app();
        let response = send(&app, multipart_request("other", "lease.pdf", "x")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "No file uploaded.");
    }

    #[tokio::test]
    async fn test_upload_strips_client_path() {
        let app = app();
        let response = send(
            &app,
            multipart_request("file", "docs/2024/nda.txt", "signed"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "nda.txt");
    }
}
