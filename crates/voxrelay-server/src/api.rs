//! Shared pieces of the HTTP layer: the error type, the standardized fallback
//! body, and request extraction helpers.

use crate::pipeline::StageFailure;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::FormRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use thiserror::Error;
use voxrelay_types::ErrorKind;

/// Name of the multipart field carrying uploaded audio or files.
const FILE_FIELD: &str = "file";

/// Body sent with every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackBody {
    pub error: bool,
    pub error_type: ErrorKind,
    pub message: String,
    pub fallback_message: String,
    pub audio_url: Option<String>,
}

impl FallbackBody {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: true,
            error_type: kind,
            message: message.into(),
            fallback_message: kind.fallback_message().to_string(),
            audio_url: None,
        }
    }
}

/// Request-level failure, rendered as a [`FallbackBody`].
#[derive(Debug, Error)]
#[error("{kind} error ({status}): {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Error for a body the extractor refused, keeping the extractor's
    /// status (413 for bodies over the limit).
    pub fn rejected_body(kind: ErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        let status = if status.is_client_error() {
            status
        } else {
            StatusCode::BAD_REQUEST
        };
        Self {
            kind,
            status,
            message: message.into(),
        }
    }
}

impl From<StageFailure> for ApiError {
    fn from(failure: StageFailure) -> Self {
        if failure.rejected {
            Self::bad_request(failure.kind(), failure.message)
        } else {
            Self::internal(failure.kind(), failure.message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(
            error_type = self.kind.as_str(),
            status = self.status.as_u16(),
            message = %self.message,
            "request failed"
        );
        (self.status, Json(FallbackBody::new(self.kind, self.message))).into_response()
    }
}

/// Renders a panic caught by `CatchPanicLayer` as a `general` 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(%detail, "request handler panicked");
    ApiError::internal(ErrorKind::General, detail).into_response()
}

/// Form body for text-input endpoints.
#[derive(Debug, Deserialize)]
pub struct TextForm {
    #[serde(default)]
    pub text: String,
}

/// Unwraps a text form, reporting a malformed body under `kind`.
pub fn text_form(
    form: Result<Form<TextForm>, FormRejection>,
    kind: ErrorKind,
) -> Result<String, ApiError> {
    form.map(|Form(f)| f.text)
        .map_err(|e| ApiError::rejected_body(kind, e.status(), e.body_text()))
}

/// A file received through a multipart upload.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: axum::body::Bytes,
}

/// Reads the `file` field from a multipart body, reporting problems under `kind`.
pub async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
    kind: ErrorKind,
) -> Result<UploadedFile, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::rejected_body(kind, e.status(), e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::rejected_body(kind, e.status(), format!("multipart error: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| {
                ApiError::rejected_body(kind, e.status(), format!("failed to read upload: {}", e))
            })?;
        return Ok(UploadedFile {
            filename,
            content_type,
            data,
        });
    }

    Err(ApiError::bad_request(kind, "no file provided"))
}
