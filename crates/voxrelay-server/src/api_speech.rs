//! Speech endpoints: synthesis, transcription and the echo flow.

use crate::{
    api::{read_file_field, text_form, ApiError, TextForm},
    pipeline::Flow,
    AppState,
};
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::FormRejection,
        Extension,
    },
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use voxrelay_types::ErrorKind;

/// Response body for `POST /tts`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TtsResponse {
    pub audio_url: String,
    pub error: bool,
}

/// Response body for `POST /transcribe/file`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub transcription: String,
    pub error: bool,
}

/// Response body for `POST /tts/echo`.
///
/// A synthesis failure keeps `error` false: the transcription is still
/// delivered, and the failure detail travels in `tts_error`, `error_type`,
/// `message` and `fallback_message`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EchoResponse {
    pub transcription: String,
    pub audio_url: Option<String>,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_message: Option<String>,
}

/// Handler for `POST /tts`.
pub async fn tts_handler(
    Extension(state): Extension<Arc<AppState>>,
    form: Result<Form<TextForm>, FormRejection>,
) -> Result<Json<TtsResponse>, ApiError> {
    let text = text_form(form, ErrorKind::Tts)?;
    let outcome = state.orchestrator.run(Flow::Synthesize { text: &text }).await?;

    Ok(Json(TtsResponse {
        audio_url: outcome.audio_url.unwrap_or_default(),
        error: false,
    }))
}

/// Handler for `POST /transcribe/file`.
pub async fn transcribe_file_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let upload = read_file_field(multipart, ErrorKind::Stt).await?;
    tracing::info!(bytes = upload.data.len(), "transcription request");

    let outcome = state
        .orchestrator
        .run(Flow::Transcribe {
            audio: &upload.data,
        })
        .await?;

    Ok(Json(TranscriptionResponse {
        transcription: outcome.transcription.unwrap_or_default(),
        error: false,
    }))
}

/// Handler for `POST /tts/echo`.
pub async fn echo_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<EchoResponse>, ApiError> {
    let upload = read_file_field(multipart, ErrorKind::General).await?;
    tracing::info!(bytes = upload.data.len(), "echo request");

    let outcome = state
        .orchestrator
        .run(Flow::Echo {
            audio: &upload.data,
        })
        .await?;

    let tts_failed = outcome.has_tts_error();
    Ok(Json(EchoResponse {
        transcription: outcome.transcription.unwrap_or_default(),
        audio_url: outcome.audio_url,
        error: false,
        tts_error: tts_failed.then_some(true),
        error_type: tts_failed.then_some(ErrorKind::Tts),
        message: outcome.tts_failure,
        fallback_message: outcome.fallback_message,
    }))
}
