//! Conversational agent endpoints: chat turns and session management.

use crate::{
    api::{read_file_field, ApiError},
    api_llm::AudioReplyResponse,
    pipeline::Flow,
    session::SessionStore,
    AppState,
};
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        Extension, Path,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use voxrelay_types::{ErrorKind, Turn};

/// Response body for `GET /agent/chat/{session_id}/history`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub chat_history: Vec<Turn>,
    pub error: bool,
}

/// Response body for `DELETE /agent/chat/{session_id}/history`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearHistoryResponse {
    pub session_id: String,
    pub message: String,
    pub error: bool,
}

/// Response body for `POST /agent/session/new`.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub error: bool,
}

/// Handler for `POST /agent/chat/{session_id}`.
///
/// Runs the full voice turn and records both the transcribed user turn and
/// the reply (generated or fallback) in the session.
pub async fn chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AudioReplyResponse>, ApiError> {
    let upload = read_file_field(multipart, ErrorKind::General).await?;
    tracing::info!(%session_id, bytes = upload.data.len(), "chat request");

    let outcome = state
        .orchestrator
        .run(Flow::Chat {
            session_id: &session_id,
            audio: &upload.data,
        })
        .await?;

    let mut response = AudioReplyResponse::from(outcome);
    response.session_id = Some(session_id);
    Ok(Json(response))
}

/// Handler for `GET /agent/chat/{session_id}/history`.
pub async fn get_history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let chat_history = state.sessions.read(&session_id);
    Json(HistoryResponse {
        session_id,
        chat_history,
        error: false,
    })
}

/// Handler for `DELETE /agent/chat/{session_id}/history`.
pub async fn clear_history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<ClearHistoryResponse> {
    if state.sessions.delete(&session_id) {
        tracing::info!(%session_id, "chat history cleared");
    }
    Json(ClearHistoryResponse {
        session_id,
        message: "Chat history cleared".to_string(),
        error: false,
    })
}

/// Handler for `POST /agent/session/new`.
pub async fn new_session_handler() -> Json<NewSessionResponse> {
    Json(NewSessionResponse {
        session_id: SessionStore::new_session_id(),
        error: false,
    })
}
