//! Conversation context types.

use serde::{Deserialize, Serialize};

use super::mastery::MasteryLevel;
use super::profile::UserInfo;
use super::style::{EmotionalState, TeachingStyle};

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything the orchestrator knows about the current turn.
///
/// Built once per request and never mutated while the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub user_info: UserInfo,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    pub current_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching_style: Option<TeachingStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_state: Option<EmotionalState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastery_level: Option<MasteryLevel>,
}

impl ConversationContext {
    /// The most recent user turns, newest first.
    pub fn recent_user_turns(&self, limit: usize) -> impl Iterator<Item = &ChatMessage> {
        self.chat_history
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .take(limit)
    }

    /// The full transcript followed by the current message, one turn per line.
    #[must_use]
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for message in &self.chat_history {
            out.push_str(message.role.as_str());
            out.push_str(": ");
            out.push_str(&message.content);
            out.push('\n');
        }
        out.push_str("user: ");
        out.push_str(&self.current_message);
        out
    }

    /// Chat history as the JSON array tools expect.
    #[must_use]
    pub fn chat_history_value(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.chat_history
                .iter()
                .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
                .collect(),
        )
    }
}
