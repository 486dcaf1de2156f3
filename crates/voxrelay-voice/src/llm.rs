use crate::config::LlmConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use voxrelay_types::Turn;

const SERVICE: &str = "Gemini";

/// Text generation collaborator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Whether a credential is available for this collaborator.
    fn is_configured(&self) -> bool;

    /// Generates a reply to `prompt`. `history` holds the earlier turns of the
    /// conversation, oldest first, and does not include `prompt` itself.
    async fn generate(&self, prompt: &str, history: &[Turn]) -> Result<String, VoiceError>;
}

/// Renders the text sent to the model.
///
/// Without history the prompt is sent verbatim. With history, each earlier
/// turn becomes a `User: ...` or `Assistant: ...` line, followed by the new
/// prompt and an open `Assistant:` cue.
pub fn render_prompt(prompt: &str, history: &[Turn]) -> String {
    if history.is_empty() {
        return prompt.to_string();
    }
    let mut context = String::new();
    for turn in history {
        context.push_str(turn.role.speaker_label());
        context.push_str(": ");
        context.push_str(&turn.content);
        context.push('\n');
    }
    context.push_str("User: ");
    context.push_str(prompt);
    context.push_str("\nAssistant:");
    context
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct LlmService {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl std::fmt::Debug for LlmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmService")
            .field("config", &self.config)
            .field("api_key", &crate::config::redact(&self.api_key))
            .finish()
    }
}

impl LlmService {
    pub fn new(config: LlmConfig, api_key: Option<String>) -> Result<Self, VoiceError> {
        let client = crate::build_client(SERVICE, config.request_timeout_secs)?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl Generator for LlmService {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, history: &[Turn]) -> Result<String, VoiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoiceError::MissingCredential(SERVICE))?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: render_prompt(prompt, history),
                }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(VoiceError::http(SERVICE))?;

        let body: GenerateResponse = crate::ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(VoiceError::http(SERVICE))?;

        let text = body.into_text();
        if text.trim().is_empty() {
            return Err(VoiceError::EmptyResult("LLM"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_history_is_verbatim() {
        assert_eq!(render_prompt("What time is it?", &[]), "What time is it?");
    }

    #[test]
    fn prompt_with_history_renders_transcript() {
        let history = vec![Turn::user("Hi there"), Turn::assistant("Hello! How can I help?")];
        let rendered = render_prompt("Tell me a joke", &history);
        assert_eq!(
            rendered,
            "User: Hi there\nAssistant: Hello! How can I help?\nUser: Tell me a joke\nAssistant:"
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "Hello, "}, {"text": "world"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(body.into_text(), "Hello, world");
    }

    #[test]
    fn blocked_response_has_no_text() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(body.into_text(), "");
    }
}
