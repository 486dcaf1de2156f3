use crate::config::TtsConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "Murf";

/// Text-to-speech collaborator.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Whether a credential is available for this collaborator.
    fn is_configured(&self) -> bool;

    /// Renders `text` to speech and returns a URL to the playable audio.
    async fn synthesize(&self, text: &str) -> Result<String, VoiceError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    format: &'a str,
    sample_rate: &'a str,
    channel_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeechResponse {
    #[serde(default)]
    audio_file: Option<String>,
}

/// Murf `speech/generate` client.
#[derive(Clone)]
pub struct TtsService {
    client: reqwest::Client,
    config: TtsConfig,
    api_key: Option<String>,
}

impl std::fmt::Debug for TtsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsService")
            .field("config", &self.config)
            .field("api_key", &crate::config::redact(&self.api_key))
            .finish()
    }
}

impl TtsService {
    pub fn new(config: TtsConfig, api_key: Option<String>) -> Result<Self, VoiceError> {
        let client = crate::build_client(SERVICE, config.request_timeout_secs)?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }
}

#[async_trait]
impl Synthesizer for TtsService {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn synthesize(&self, text: &str) -> Result<String, VoiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoiceError::MissingCredential(SERVICE))?;

        let payload = SpeechRequest {
            text,
            voice_id: &self.config.voice_id,
            format: &self.config.format,
            sample_rate: &self.config.sample_rate,
            channel_type: &self.config.channel_type,
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/speech/generate",
                self.config.base_url.trim_end_matches('/')
            ))
            .header("api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(VoiceError::http(SERVICE))?;

        // Murf signals success with exactly 200; other 2xx codes carry no audio.
        if response.status() != reqwest::StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Status {
                service: SERVICE,
                status,
                body: voxrelay_types::excerpt(&body, crate::ERROR_BODY_EXCERPT_CHARS).to_string(),
            });
        }

        let body: SpeechResponse = response.json().await.map_err(VoiceError::http(SERVICE))?;
        body.audio_file
            .filter(|url| !url.is_empty())
            .ok_or(VoiceError::MissingAudioUrl)
    }
}
