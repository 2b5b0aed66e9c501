//! Product image blobs.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Re-uploading a file with the same name overwrites the blob.
const IMAGE_CACHE_CONTROL: &str = "public, max-age=300";

/// Serve an image blob with its stored content type.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    let blob = state
        .storage()
        .get_image(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("image {name}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type),
            (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL.to_string()),
        ],
        blob.bytes,
    ))
}
