//! Text generation endpoints.

use crate::{
    api::{read_file_field, text_form, ApiError, TextForm},
    pipeline::{ChainOutcome, Flow},
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
use voxrelay_types::{ErrorKind, Turn};

/// Response body for `POST /llm/query`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LlmQueryResponse {
    pub response: String,
    pub input: String,
    pub error: bool,
    /// The response is the fixed fallback reply, not a generated one.
    pub has_fallback: bool,
}

/// Response body for the audio-in, audio-out flows (`/llm/query/audio` and
/// `/agent/chat/{session_id}`).
///
/// `error` stays false whenever transcription succeeded; degraded stages are
/// reported through `has_llm_fallback` and `tts_error`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioReplyResponse {
    pub transcription: String,
    pub llm_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<Turn>>,
    pub audio_url: Option<String>,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_llm_fallback: Option<bool>,
}

impl From<ChainOutcome> for AudioReplyResponse {
    fn from(outcome: ChainOutcome) -> Self {
        let tts_failed = outcome.has_tts_error();
        let llm_failed = outcome.has_llm_fallback();
        Self {
            transcription: outcome.transcription.unwrap_or_default(),
            llm_response: outcome.response.unwrap_or_default(),
            session_id: None,
            chat_history: outcome.history,
            audio_url: outcome.audio_url,
            error: false,
            tts_error: tts_failed.then_some(true),
            fallback_message: outcome.fallback_message,
            has_llm_fallback: llm_failed.then_some(true),
        }
    }
}

/// Handler for `POST /llm/query`.
pub async fn llm_query_handler(
    Extension(state): Extension<Arc<AppState>>,
    form: Result<Form<TextForm>, FormRejection>,
) -> Result<Json<LlmQueryResponse>, ApiError> {
    let text = text_form(form, ErrorKind::Llm)?;
    let outcome = state.orchestrator.run(Flow::Generate { text: &text }).await?;

    let has_fallback = outcome.has_llm_fallback();
    Ok(Json(LlmQueryResponse {
        response: outcome.response.unwrap_or_default(),
        input: text,
        error: false,
        has_fallback,
    }))
}

/// Handler for `POST /llm/query/audio`.
pub async fn llm_query_audio_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AudioReplyResponse>, ApiError> {
    let upload = read_file_field(multipart, ErrorKind::General).await?;
    tracing::info!(bytes = upload.data.len(), "audio query request");

    let outcome = state
        .orchestrator
        .run(Flow::AudioQuery {
            audio: &upload.data,
        })
        .await?;

    Ok(Json(outcome.into()))
}
