//! External speech and language collaborators for voxrelay.
//!
//! Each collaborator sits behind a small async trait so the request pipeline
//! can be driven by the real HTTP clients in production and by fakes in tests:
//!
//! - [`Transcriber`]: raw audio bytes to text (AssemblyAI).
//! - [`Generator`]: prompt plus prior turns to a reply (Gemini).
//! - [`Synthesizer`]: text to a playable audio URL (Murf).
//!
//! Every client checks for its credential before touching the network and
//! reports a missing key as an ordinary [`VoiceError`].

pub mod config;
pub mod error;
pub mod llm;
pub mod stt;
pub mod tts;

pub use config::{Credentials, LlmConfig, SttConfig, TtsConfig, VoiceConfig};
pub use error::VoiceError;
pub use llm::{render_prompt, Generator, LlmService};
pub use stt::{SttService, Transcriber};
pub use tts::{Synthesizer, TtsService};

use std::time::Duration;

/// Longest slice of a remote error body kept in a [`VoiceError::Status`].
const ERROR_BODY_EXCERPT_CHARS: usize = 200;

/// Builds a client whose every request is bounded by `timeout_secs`.
fn build_client(service: &'static str, timeout_secs: u64) -> Result<reqwest::Client, VoiceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(VoiceError::http(service))
}

/// Turns a non-2xx response into [`VoiceError::Status`].
async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, VoiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(VoiceError::Status {
        service,
        status: status.as_u16(),
        body: voxrelay_types::excerpt(&body, ERROR_BODY_EXCERPT_CHARS).to_string(),
    })
}
