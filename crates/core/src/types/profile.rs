//! Student identity and free-text profile summaries.

use serde::{Deserialize, Serialize};

/// The student profile sent along with every tool request.
///
/// The three summaries are free text written by the tutoring front-end; the
/// orchestrator only keyword-matches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Unique identifier for the student.
    pub user_id: String,
    /// Student's display name.
    pub name: String,
    /// Student's current grade level.
    pub grade_level: String,
    /// Summary of the student's preferred learning style.
    pub learning_style_summary: String,
    /// Summary of the student's current emotional state.
    pub emotional_state_summary: String,
    /// Summary of the student's mastery of the current material.
    pub mastery_level_summary: String,
}

impl UserInfo {
    /// Serialize into the JSON object shape tools expect.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "user_id": self.user_id,
            "name": self.name,
            "grade_level": self.grade_level,
            "learning_style_summary": self.learning_style_summary,
            "emotional_state_summary": self.emotional_state_summary,
            "mastery_level_summary": self.mastery_level_summary,
        })
    }
}
