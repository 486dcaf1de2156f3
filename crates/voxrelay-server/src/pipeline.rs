//! Chained calls across the transcription, generation and synthesis
//! collaborators.
//!
//! Every request flow is a fixed sequence of [`Stage`]s run by
//! [`Orchestrator::run`]. The partial-failure policy is the same for all
//! flows:
//!
//! - a failure of the *first* stage (including rejected blank text input)
//!   aborts the request with a [`StageFailure`];
//! - generation failing later on, or as the only stage, substitutes
//!   [`LLM_FALLBACK_RESPONSE`] and flags it;
//! - synthesis failing after an earlier stage succeeded keeps everything
//!   produced so far, flags the failure and attaches a flow-specific fallback
//!   message.

use crate::session::SessionStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use voxrelay_types::{excerpt, ErrorKind, Role, Turn, LLM_FALLBACK_RESPONSE};
use voxrelay_voice::{
    Credentials, Generator, LlmService, SttService, Synthesizer, Transcriber, TtsService,
    VoiceConfig, VoiceError,
};

/// Characters of produced text included in log lines.
const LOG_EXCERPT_CHARS: usize = 50;

/// One delegated call to an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcribe,
    Generate,
    Synthesize,
}

impl Stage {
    /// The error category reported when this stage fails.
    pub fn error_kind(self) -> ErrorKind {
        match self {
            Self::Transcribe => ErrorKind::Stt,
            Self::Generate => ErrorKind::Llm,
            Self::Synthesize => ErrorKind::Tts,
        }
    }
}

/// A request flow together with its input.
#[derive(Debug, Clone, Copy)]
pub enum Flow<'a> {
    /// audio → text
    Transcribe { audio: &'a [u8] },
    /// text → audio URL
    Synthesize { text: &'a str },
    /// text → reply
    Generate { text: &'a str },
    /// audio → text → audio URL
    Echo { audio: &'a [u8] },
    /// audio → text → reply → audio URL
    AudioQuery { audio: &'a [u8] },
    /// audio → text → reply (with session context) → audio URL
    Chat { session_id: &'a str, audio: &'a [u8] },
}

impl<'a> Flow<'a> {
    /// The stages this flow runs, in order.
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Self::Transcribe { .. } => &[Stage::Transcribe],
            Self::Synthesize { .. } => &[Stage::Synthesize],
            Self::Generate { .. } => &[Stage::Generate],
            Self::Echo { .. } => &[Stage::Transcribe, Stage::Synthesize],
            Self::AudioQuery { .. } | Self::Chat { .. } => {
                &[Stage::Transcribe, Stage::Generate, Stage::Synthesize]
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Transcribe { .. } => "transcribe",
            Self::Synthesize { .. } => "synthesize",
            Self::Generate { .. } => "generate",
            Self::Echo { .. } => "echo",
            Self::AudioQuery { .. } => "audio_query",
            Self::Chat { .. } => "chat",
        }
    }

    fn session_id(&self) -> Option<&'a str> {
        match *self {
            Self::Chat { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    fn audio(&self) -> &'a [u8] {
        match *self {
            Self::Transcribe { audio }
            | Self::Echo { audio }
            | Self::AudioQuery { audio }
            | Self::Chat { audio, .. } => audio,
            Self::Synthesize { .. } | Self::Generate { .. } => &[],
        }
    }

    fn text(&self) -> &'a str {
        match *self {
            Self::Synthesize { text } | Self::Generate { text } => text,
            _ => "",
        }
    }

    /// Message returned when synthesis fails after `text` was produced.
    fn synthesis_fallback(&self, text: &str) -> String {
        match self {
            Self::Echo { .. } => format!("I heard you say: {} (Audio generation failed)", text),
            Self::Chat { .. } => format!(
                "I'm having trouble with audio generation. Here's my response: {}",
                text
            ),
            _ => format!(
                "I'm having trouble generating audio right now. Here's my text response: {}",
                text
            ),
        }
    }
}

/// A failure that aborts the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage:?} stage failed: {message}")]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
    /// The input was refused before any collaborator was called.
    pub rejected: bool,
}

impl StageFailure {
    fn rejected(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            rejected: true,
        }
    }

    fn failed(stage: Stage, err: &VoiceError) -> Self {
        Self {
            stage,
            message: err.to_string(),
            rejected: false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.stage.error_kind()
    }
}

/// Everything one chained call produced. Transient; never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOutcome {
    pub transcription: Option<String>,
    pub response: Option<String>,
    pub audio_url: Option<String>,
    /// Why generation failed; `response` then holds the fallback reply.
    pub llm_failure: Option<String>,
    /// Why synthesis failed after earlier stages succeeded.
    pub tts_failure: Option<String>,
    /// User-facing text accompanying a synthesis failure.
    pub fallback_message: Option<String>,
    /// Full transcript after a chat turn.
    pub history: Option<Vec<Turn>>,
}

impl ChainOutcome {
    pub fn has_llm_fallback(&self) -> bool {
        self.llm_failure.is_some()
    }

    pub fn has_tts_error(&self) -> bool {
        self.tts_failure.is_some()
    }
}

/// The three collaborators used by the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub generator: Arc<dyn Generator>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl Collaborators {
    /// Builds the production HTTP clients.
    pub fn from_config(config: &VoiceConfig, credentials: Credentials) -> Result<Self, VoiceError> {
        Ok(Self {
            transcriber: Arc::new(SttService::new(config.stt.clone(), credentials.assemblyai)?),
            generator: Arc::new(LlmService::new(config.llm.clone(), credentials.gemini)?),
            synthesizer: Arc::new(TtsService::new(config.tts.clone(), credentials.murf)?),
        })
    }
}

/// Credential presence per collaborator, as reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ApiStatus {
    pub murf_api: bool,
    pub assemblyai_api: bool,
    pub gemini_api: bool,
}

/// Runs request flows against the collaborators and the session store.
pub struct Orchestrator {
    collaborators: Collaborators,
    sessions: Arc<SessionStore>,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, sessions: Arc<SessionStore>) -> Self {
        Self {
            collaborators,
            sessions,
        }
    }

    pub fn api_status(&self) -> ApiStatus {
        ApiStatus {
            murf_api: self.collaborators.synthesizer.is_configured(),
            assemblyai_api: self.collaborators.transcriber.is_configured(),
            gemini_api: self.collaborators.generator.is_configured(),
        }
    }

    /// Runs every stage of `flow` in order and folds the outcomes together.
    pub async fn run(&self, flow: Flow<'_>) -> Result<ChainOutcome, StageFailure> {
        let mut outcome = ChainOutcome::default();
        // Text handed from one stage to the next.
        let mut text = flow.text().to_string();
        let mut context: Vec<Turn> = Vec::new();

        for (index, &stage) in flow.stages().iter().enumerate() {
            let first = index == 0;

            if first && stage != Stage::Transcribe && text.trim().is_empty() {
                return Err(StageFailure::rejected(stage, "Empty text provided"));
            }

            match stage {
                Stage::Transcribe => {
                    let transcript = self
                        .transcribe(flow.audio())
                        .await
                        .map_err(|e| StageFailure::failed(stage, &e))?;
                    if let Some(session_id) = flow.session_id() {
                        context = self.sessions.record_user_turn(session_id, transcript.as_str());
                    }
                    outcome.transcription = Some(transcript.clone());
                    text = transcript;
                }
                Stage::Generate => {
                    let reply = match self.generate(&text, &context).await {
                        Ok(reply) => reply,
                        Err(e) => {
                            outcome.llm_failure = Some(e.to_string());
                            LLM_FALLBACK_RESPONSE.to_string()
                        }
                    };
                    if let Some(session_id) = flow.session_id() {
                        self.sessions
                            .append(session_id, Role::Assistant, reply.as_str());
                    }
                    outcome.response = Some(reply.clone());
                    text = reply;
                }
                Stage::Synthesize => match self.synthesize(&text).await {
                    Ok(url) => outcome.audio_url = Some(url),
                    Err(e) if first => return Err(StageFailure::failed(stage, &e)),
                    Err(e) => {
                        outcome.tts_failure = Some(e.to_string());
                        outcome.fallback_message = Some(flow.synthesis_fallback(&text));
                    }
                },
            }
        }

        if let Some(session_id) = flow.session_id() {
            outcome.history = Some(self.sessions.read(session_id));
        }

        info!(
            flow = flow.name(),
            llm_fallback = outcome.has_llm_fallback(),
            tts_error = outcome.has_tts_error(),
            "pipeline finished"
        );
        Ok(outcome)
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError> {
        match self.collaborators.transcriber.transcribe(audio).await {
            Ok(text) => {
                info!(excerpt = excerpt(&text, LOG_EXCERPT_CHARS), "transcription successful");
                Ok(text)
            }
            Err(e) => {
                error!(error = %e, "transcription error");
                Err(e)
            }
        }
    }

    async fn generate(&self, prompt: &str, history: &[Turn]) -> Result<String, VoiceError> {
        match self.collaborators.generator.generate(prompt, history).await {
            Ok(reply) => {
                info!(
                    excerpt = excerpt(&reply, LOG_EXCERPT_CHARS),
                    context_turns = history.len(),
                    "llm response generated"
                );
                Ok(reply)
            }
            Err(e) => {
                error!(error = %e, "llm generation error");
                Err(e)
            }
        }
    }

    async fn synthesize(&self, text: &str) -> Result<String, VoiceError> {
        match self.collaborators.synthesizer.synthesize(text).await {
            Ok(url) => {
                info!(excerpt = excerpt(text, LOG_EXCERPT_CHARS), "tts generation successful");
                Ok(url)
            }
            Err(e) => {
                error!(error = %e, "tts generation error");
                Err(e)
            }
        }
    }
}
