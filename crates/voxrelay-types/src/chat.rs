//! Conversation turn definitions.
//!
//! A session transcript is an ordered `Vec<Turn>`. Turns serialize as
//! `{"role": "user" | "assistant", "content": "..."}`, which is the shape
//! returned by the chat history endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human speaking to the agent.
    User,
    /// The generated reply.
    Assistant,
}

impl Role {
    /// Returns the lowercase wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Returns the speaker prefix used when a transcript is rendered as prompt
    /// context (`User: ...` / `Assistant: ...`).
    pub fn speaker_label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
