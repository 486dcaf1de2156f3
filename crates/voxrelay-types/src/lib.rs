//! Shared types and constants for voxrelay.
//!
//! This crate holds the serializable vocabulary used by both the collaborator
//! clients in `voxrelay-voice` and the HTTP layer in `voxrelay-server`:
//! conversation turns, the error taxonomy reported to callers, and the fixed
//! fallback sentences returned when a pipeline stage degrades.

pub mod chat;

pub use chat::{Role, Turn};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reply substituted for the generated response when text generation fails.
pub const LLM_FALLBACK_RESPONSE: &str =
    "I apologize, but I'm having trouble processing your request right now. Could you please try again?";

/// Category of a failure as reported in the `error_type` field of error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Speech-to-text failures.
    Stt,
    /// Text generation failures.
    Llm,
    /// Text-to-speech failures.
    Tts,
    /// Anything else: malformed requests, upload I/O, caught panics.
    General,
}

impl ErrorKind {
    /// Returns the wire label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stt => "stt",
            Self::Llm => "llm",
            Self::Tts => "tts",
            Self::General => "general",
        }
    }

    /// Returns the user-facing sentence sent as `fallback_message` when a
    /// request fails with this kind.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Stt => "I'm having trouble hearing you right now. Could you please try again?",
            Self::Llm => {
                "I'm having difficulty processing your request at the moment. Please try again later."
            }
            Self::Tts => {
                "I'm having trouble generating audio right now. Here's my text response instead."
            }
            Self::General => "I'm experiencing technical difficulties. Please try again in a moment.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
///
/// Used for log lines and error bodies so that long transcripts or remote
/// responses never flood the output.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
