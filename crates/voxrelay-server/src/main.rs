//! voxrelay server binary.
//!
//! Loads configuration and credentials, starts the axum HTTP server with
//! structured logging, and shuts down gracefully on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use voxrelay_server::{app, config, pipeline::Collaborators, AppState};
use voxrelay_voice::config::{
    ASSEMBLYAI_API_KEY_ENV, GEMINI_API_KEY_ENV, MURF_API_KEY_ENV,
};
use voxrelay_voice::Credentials;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("VOXRELAY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn report_credentials(credentials: &Credentials) {
    for (name, present) in [
        (ASSEMBLYAI_API_KEY_ENV, credentials.assemblyai.is_some()),
        (GEMINI_API_KEY_ENV, credentials.gemini.is_some()),
        (MURF_API_KEY_ENV, credentials.murf.is_some()),
    ] {
        if present {
            tracing::info!(key = name, "API key configured");
        } else {
            tracing::warn!(key = name, "API key not found; requests needing it will fall back");
        }
    }
}

#[tokio::main]
async fn main() {
    // A missing .env file is normal in production.
    let dotenv_path = dotenvy::dotenv().ok();

    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        dotenv = ?dotenv_path,
        "resolved startup configuration path"
    );

    let credentials = Credentials::from_env();
    report_credentials(&credentials);

    let collaborators = Collaborators::from_config(&config.voice, credentials)
        .expect("failed to build HTTP clients for the speech and language services");

    tokio::fs::create_dir_all(&config.server.upload_dir)
        .await
        .expect("failed to create upload directory: check server.upload_dir in config");

    // Build application
    let state = AppState::new(collaborators, &config.server);
    let sessions = Arc::clone(&state.sessions);
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting voxrelay server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!(
        sessions = sessions.len(),
        "voxrelay server shut down, dropping in-memory sessions"
    );
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
