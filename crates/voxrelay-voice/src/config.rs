use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Environment variable holding the AssemblyAI credential.
pub const ASSEMBLYAI_API_KEY_ENV: &str = "ASSEMBLYAI_API_KEY";
/// Environment variable holding the Gemini credential.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable holding the Murf credential.
pub const MURF_API_KEY_ENV: &str = "MURF_API_KEY";

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_stt_base_url() -> String {
    "https://api.assemblyai.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_wait_secs() -> u64 {
    120
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_llm_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_tts_base_url() -> String {
    "https://api.murf.ai".to_string()
}

fn default_voice_id() -> String {
    "en-US-terrell".to_string()
}

fn default_format() -> String {
    "mp3".to_string()
}

fn default_sample_rate() -> String {
    "24000".to_string()
}

fn default_channel_type() -> String {
    "STEREO".to_string()
}

/// Settings for all three external collaborators (`[voice]` config section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tts: TtsConfig,
}

/// AssemblyAI transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default = "default_stt_base_url")]
    pub base_url: String,
    /// Timeout for each individual HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Delay between transcript status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on the whole upload + poll cycle.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: default_stt_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl SttConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Gemini text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Murf speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: String,
    #[serde(default = "default_channel_type")]
    pub channel_type: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tts_base_url(),
            voice_id: default_voice_id(),
            format: default_format(),
            sample_rate: default_sample_rate(),
            channel_type: default_channel_type(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// API keys for the external collaborators.
///
/// Keys are only ever read from the environment and never serialized. An
/// empty value is treated the same as an unset one.
#[derive(Clone, Default)]
pub struct Credentials {
    pub assemblyai: Option<String>,
    pub gemini: Option<String>,
    pub murf: Option<String>,
}

/// Stand-in printed for a credential in `Debug` output.
pub(crate) fn redact(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "[REDACTED]"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("assemblyai", &redact(&self.assemblyai))
            .field("gemini", &redact(&self.gemini))
            .field("murf", &redact(&self.murf))
            .finish()
    }
}

impl Credentials {
    pub fn new(
        assemblyai: Option<String>,
        gemini: Option<String>,
        murf: Option<String>,
    ) -> Self {
        Self {
            assemblyai: non_empty(assemblyai),
            gemini: non_empty(gemini),
            murf: non_empty(murf),
        }
    }

    /// Reads all three keys from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads all three keys through `lookup`, keyed by environment variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::new(
            lookup(ASSEMBLYAI_API_KEY_ENV),
            lookup(GEMINI_API_KEY_ENV),
            lookup(MURF_API_KEY_ENV),
        )
    }
}

fn non_empty(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}
