//! Scripted collaborators shared by the server integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use voxrelay_server::config::ServerConfig;
use voxrelay_server::pipeline::Collaborators;
use voxrelay_server::{app, AppState};
use voxrelay_types::Turn;
use voxrelay_voice::{Generator, Synthesizer, Transcriber, VoiceError};

pub const AUDIO_URL: &str = "https://murf.example/audio/clip.mp3";

/// Stand-in for all three collaborators.
///
/// Transcription pops the next queued transcript and fails once the queue is
/// empty. Generation replies `"reply to <prompt>"` unless marked down.
/// Synthesis returns [`AUDIO_URL`] unless marked down. Every call is counted.
#[derive(Default)]
pub struct FakeVoice {
    transcripts: Mutex<VecDeque<String>>,
    llm_down: bool,
    tts_down: bool,
    panic_on_transcribe: bool,
    configured: bool,
    pub transcribe_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub synthesize_calls: AtomicUsize,
    /// History passed to each generation call.
    pub contexts: Mutex<Vec<Vec<Turn>>>,
    /// Text passed to each synthesis call.
    pub synthesized: Mutex<Vec<String>>,
}

impl FakeVoice {
    pub fn new() -> Self {
        Self {
            configured: true,
            ..Self::default()
        }
    }

    /// Queues a transcript for the next transcription call.
    pub fn hearing(self, transcript: &str) -> Self {
        self.transcripts
            .lock()
            .unwrap()
            .push_back(transcript.to_string());
        self
    }

    pub fn llm_down(mut self) -> Self {
        self.llm_down = true;
        self
    }

    pub fn tts_down(mut self) -> Self {
        self.tts_down = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_transcribe = true;
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.transcribe_calls.load(Ordering::SeqCst),
            self.generate_calls.load(Ordering::SeqCst),
            self.synthesize_calls.load(Ordering::SeqCst),
        )
    }

}

/// Wires one fake in as all three collaborators.
pub fn collaborators(fake: &Arc<FakeVoice>) -> Collaborators {
    Collaborators {
        transcriber: fake.clone(),
        generator: fake.clone(),
        synthesizer: fake.clone(),
    }
}

#[async_trait]
impl Transcriber for FakeVoice {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn transcribe(&self, _audio: &[u8]) -> Result<String, VoiceError> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_transcribe {
            panic!("transcriber crashed");
        }
        self.transcripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(VoiceError::EmptyResult("Transcription"))
    }
}

#[async_trait]
impl Generator for FakeVoice {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, prompt: &str, history: &[Turn]) -> Result<String, VoiceError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(history.to_vec());
        if self.llm_down {
            return Err(VoiceError::Status {
                service: "Gemini",
                status: 503,
                body: "model overloaded".to_string(),
            });
        }
        Ok(format!("reply to {}", prompt))
    }
}

#[async_trait]
impl Synthesizer for FakeVoice {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn synthesize(&self, text: &str) -> Result<String, VoiceError> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        self.synthesized.lock().unwrap().push(text.to_string());
        if self.tts_down {
            return Err(VoiceError::MissingCredential("Murf"));
        }
        Ok(AUDIO_URL.to_string())
    }
}

/// Builds app state around `fake`, with uploads going to `upload_dir`.
pub fn state_with(fake: &Arc<FakeVoice>, upload_dir: &std::path::Path) -> AppState {
    let server = ServerConfig {
        upload_dir: upload_dir.to_path_buf(),
        static_dir: upload_dir.join("no-static"),
        ..ServerConfig::default()
    };
    AppState::new(collaborators(fake), &server)
}

/// Builds the router around `fake`. Returns the state too so tests can
/// inspect the session store.
pub fn router_with(fake: &Arc<FakeVoice>, upload_dir: &std::path::Path) -> (axum::Router, AppState) {
    let state = state_with(fake, upload_dir);
    (app(state.clone()), state)
}

pub const BOUNDARY: &str = "voxrelay-test-boundary";

/// Encodes a single-file multipart body under field `file`.
pub fn multipart_body(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn audio_request(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(axum::body::Body::from(multipart_body(
            "speech.webm",
            "audio/webm",
            b"\x1aE\xdf\xa3fake-webm",
        )))
        .unwrap()
}

pub fn form_request(uri: &str, text: &str) -> axum::http::Request<axum::body::Body> {
    let encoded: String = text
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            b' ' => "+".to_string(),
            other => format!("%{:02X}", other),
        })
        .collect();
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(format!("text={}", encoded)))
        .unwrap()
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
