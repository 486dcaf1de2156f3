use crate::config::SttConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const SERVICE: &str = "AssemblyAI";

/// Speech-to-text collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Whether a credential is available for this collaborator.
    fn is_configured(&self) -> bool;

    /// Transcribes raw audio bytes. An empty transcript is an error.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscriptJob {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// AssemblyAI client: uploads the audio, creates a transcript job and polls it
/// until it completes, fails, or `max_wait_secs` elapses.
#[derive(Clone)]
pub struct SttService {
    client: reqwest::Client,
    config: SttConfig,
    api_key: Option<String>,
}

impl std::fmt::Debug for SttService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttService")
            .field("config", &self.config)
            .field("api_key", &crate::config::redact(&self.api_key))
            .finish()
    }
}

impl SttService {
    pub fn new(config: SttConfig, api_key: Option<String>) -> Result<Self, VoiceError> {
        let client = crate::build_client(SERVICE, config.request_timeout_secs)?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn upload(&self, api_key: &str, audio: &[u8]) -> Result<String, VoiceError> {
        let response = self
            .client
            .post(self.url("/v2/upload"))
            .header("authorization", api_key)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(VoiceError::http(SERVICE))?;
        let upload: UploadResponse = crate::ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(VoiceError::http(SERVICE))?;
        Ok(upload.upload_url)
    }

    async fn create_job(&self, api_key: &str, audio_url: &str) -> Result<TranscriptJob, VoiceError> {
        let response = self
            .client
            .post(self.url("/v2/transcript"))
            .header("authorization", api_key)
            .json(&TranscriptRequest { audio_url })
            .send()
            .await
            .map_err(VoiceError::http(SERVICE))?;
        crate::ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(VoiceError::http(SERVICE))
    }

    async fn fetch_job(&self, api_key: &str, id: &str) -> Result<TranscriptJob, VoiceError> {
        let response = self
            .client
            .get(self.url(&format!("/v2/transcript/{}", id)))
            .header("authorization", api_key)
            .send()
            .await
            .map_err(VoiceError::http(SERVICE))?;
        crate::ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(VoiceError::http(SERVICE))
    }
}

#[async_trait]
impl Transcriber for SttService {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoiceError::MissingCredential(SERVICE))?;

        let deadline = Instant::now() + Duration::from_secs(self.config.max_wait_secs);

        let audio_url = self.upload(api_key, audio).await?;
        debug!(bytes = audio.len(), "uploaded audio for transcription");

        let mut job = self.create_job(api_key, &audio_url).await?;
        loop {
            match job.status.as_str() {
                "completed" => {
                    let text = job.text.unwrap_or_default();
                    if text.trim().is_empty() {
                        return Err(VoiceError::EmptyResult("Transcription"));
                    }
                    return Ok(text);
                }
                "error" => {
                    return Err(VoiceError::Transcription(
                        job.error.unwrap_or_else(|| "unknown error".to_string()),
                    ));
                }
                status => debug!(id = %job.id, status, "transcript not ready"),
            }

            if Instant::now() >= deadline {
                return Err(VoiceError::Timeout {
                    service: SERVICE,
                    secs: self.config.max_wait_secs,
                });
            }
            tokio::time::sleep(self.config.poll_interval()).await;
            job = self.fetch_job(api_key, &job.id).await?;
        }
    }
}
