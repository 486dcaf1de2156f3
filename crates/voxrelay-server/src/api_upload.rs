//! Raw file upload handler.
//!
//! Stores the uploaded bytes under the upload directory, which is served back
//! at `/uploads/*`.

use crate::{
    api::{read_file_field, ApiError},
    AppState,
};
use axum::extract::{
    multipart::{Multipart, MultipartRejection},
    Extension,
};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use voxrelay_types::ErrorKind;

/// Response body for `POST /upload`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub content_type: Option<String>,
    pub size: usize,
    pub url: String,
    pub error: bool,
}

/// Reduces a client-supplied filename to its final path component so uploads
/// can never escape the upload directory. Falls back to a random name.
fn sanitize_filename(name: Option<&str>) -> String {
    name.and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty() && n != "." && n != "..")
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Handler for `POST /upload`.
pub async fn upload_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload = read_file_field(multipart, ErrorKind::General).await?;
    let filename = sanitize_filename(upload.filename.as_deref());

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| {
            ApiError::internal(
                ErrorKind::General,
                format!("failed to create upload dir: {}", e),
            )
        })?;

    let file_path = state.upload_dir.join(&filename);
    tokio::fs::write(&file_path, &upload.data)
        .await
        .map_err(|e| ApiError::internal(ErrorKind::General, format!("failed to write file: {}", e)))?;

    tracing::info!(%filename, size = upload.data.len(), "stored upload");

    Ok(Json(UploadResponse {
        url: format!("/uploads/{}", filename),
        filename,
        content_type: upload.content_type,
        size: upload.data.len(),
        error: false,
    }))
}
