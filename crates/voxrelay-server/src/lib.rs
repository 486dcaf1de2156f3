//! voxrelay server library logic.
//!
//! Exposes the HTTP surface of the voice agent: every endpoint shapes a
//! request into a [`pipeline::Flow`], runs it through the shared
//! [`pipeline::Orchestrator`], and renders the outcome.

pub mod api;
pub mod api_agent;
pub mod api_llm;
pub mod api_speech;
pub mod api_upload;
pub mod config;
pub mod pipeline;
pub mod session;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use config::ServerConfig;
use pipeline::{ApiStatus, Collaborators, Orchestrator};
use serde::{Deserialize, Serialize};
use session::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Conversation transcripts, owned for the life of the process.
    pub sessions: Arc<SessionStore>,
    /// Runs request flows against the external collaborators.
    pub orchestrator: Arc<Orchestrator>,
    /// Directory for uploaded files.
    pub upload_dir: PathBuf,
    /// Directory for static assets and `index.html`.
    pub static_dir: PathBuf,
    /// Request body limit in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(collaborators: Collaborators, server: &ServerConfig) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let orchestrator = Arc::new(Orchestrator::new(collaborators, sessions.clone()));
        Self {
            sessions,
            orchestrator,
            upload_dir: server.upload_dir.clone(),
            static_dir: server.static_dir.clone(),
            max_upload_bytes: server.max_upload_bytes,
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub api_status: ApiStatus,
    pub error: bool,
}

/// Health check handler.
///
/// Reports which collaborator credentials are present. Never calls out to
/// the collaborators themselves.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_status: state.orchestrator.api_status(),
        error: false,
    })
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/tts", post(api_speech::tts_handler))
        .route("/tts/echo", post(api_speech::echo_handler))
        .route(
            "/transcribe/file",
            post(api_speech::transcribe_file_handler),
        )
        .route("/upload", post(api_upload::upload_handler))
        .route("/llm/query", post(api_llm::llm_query_handler))
        .route("/llm/query/audio", post(api_llm::llm_query_audio_handler))
        .route("/agent/chat/{session_id}", post(api_agent::chat_handler))
        .route(
            "/agent/chat/{session_id}/history",
            get(api_agent::get_history_handler).delete(api_agent::clear_history_handler),
        )
        .route(
            "/agent/session/new",
            post(api_agent::new_session_handler),
        );

    // Serve uploaded files under /uploads/*
    let router = if state.upload_dir.exists() {
        tracing::info!(path = %state.upload_dir.display(), "serving uploaded files at /uploads");
        router.nest_service("/uploads", ServeDir::new(&state.upload_dir))
    } else {
        tracing::info!(path = %state.upload_dir.display(), "uploads directory not found, skipping /uploads");
        router
    };

    // Serve the web client if present.
    let index = state.static_dir.join("index.html");
    let router = if state.static_dir.exists() {
        tracing::info!(path = %state.static_dir.display(), "serving static files at /static");
        let router = router.nest_service("/static", ServeDir::new(&state.static_dir));
        if index.exists() {
            router.route_service("/", ServeFile::new(index))
        } else {
            router
        }
    } else {
        tracing::info!(path = %state.static_dir.display(), "static directory not found, skipping static file serving");
        router
    };

    router
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(CatchPanicLayer::custom(api::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
