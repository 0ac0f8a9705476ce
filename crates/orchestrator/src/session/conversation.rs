//! Conversation sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tutor_orchestrator_core::{ChatMessage, ToolResponse};
use uuid::Uuid;

/// Most chat turns a session keeps.
pub const MAX_SESSION_HISTORY: usize = 50;

/// One tool call made on the student's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInteraction {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    /// The flat payload that was sent.
    pub request: Value,
    pub response: ToolResponse,
}

/// A student's ongoing conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub user_id: String,
    pub chat_history: Vec<ChatMessage>,
    pub tool_interactions: Vec<ToolInteraction>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationSession {
    /// A new, empty session with a random id.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            chat_history: Vec::new(),
            tool_interactions: Vec::new(),
            started_at: now,
            last_activity: now,
        }
    }

    /// Append a turn, dropping the oldest beyond [`MAX_SESSION_HISTORY`].
    pub fn push_message(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
        let overflow = self.chat_history.len().saturating_sub(MAX_SESSION_HISTORY);
        if overflow > 0 {
            self.chat_history.drain(..overflow);
        }
        self.last_activity = Utc::now();
    }

    pub fn record_interaction(&mut self, tool_name: &str, request: Value, response: ToolResponse) {
        let now = Utc::now();
        self.tool_interactions.push(ToolInteraction {
            timestamp: now,
            tool_name: tool_name.to_string(),
            request,
            response,
        });
        self.last_activity = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_capped() {
        let mut session = ConversationSession::new("student-1");
        for i in 0..60 {
            session.push_message(ChatMessage::user(format!("turn {i}")));
        }
        assert_eq!(session.chat_history.len(), MAX_SESSION_HISTORY);
        assert_eq!(session.chat_history[0].content, "turn 10");
        assert_eq!(session.chat_history[49].content, "turn 59");
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = ConversationSession::new("student-1");
        let b = ConversationSession::new("student-1");
        assert_ne!(a.session_id, b.session_id);
        assert!(a.tool_interactions.is_empty());
    }
}
