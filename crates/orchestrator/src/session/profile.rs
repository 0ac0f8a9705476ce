//! Student profiles and what can be inferred from their summaries.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tutor_orchestrator_core::{
    ChatMessage, ConversationContext, EmotionalState, MasteryLevel, TeachingStyle, UserInfo,
};

static LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"level\s*(\d{1,3})\b").expect("Invalid regex"));

/// Mastery keywords, checked in order when no explicit level is given.
const MASTERY_KEYWORDS: &[(&str, i64)] = &[
    ("foundation", 1),
    ("building", 4),
    ("good", 6),
    ("proficient", 7),
    ("advanced", 9),
    ("master", 10),
];

const DEFAULT_MASTERY: u8 = 5;

/// One entry in a student's learning history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub timestamp: DateTime<Utc>,
    pub topic: String,
    pub mastery_increase: u8,
}

/// A student's profile plus the teaching signals inferred from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_info: UserInfo,
    pub teaching_style: TeachingStyle,
    pub emotional_state: EmotionalState,
    pub mastery_level: MasteryLevel,
    pub learning_history: Vec<LearningRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    /// Build a profile, inferring style, state and mastery from the summaries.
    #[must_use]
    pub fn from_user_info(user_info: UserInfo) -> Self {
        let now = Utc::now();
        Self {
            teaching_style: infer_teaching_style(&user_info.learning_style_summary),
            emotional_state: infer_emotional_state(&user_info.emotional_state_summary),
            mastery_level: infer_mastery_level(&user_info.mastery_level_summary),
            user_info,
            learning_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Context for one turn of conversation.
    #[must_use]
    pub fn context(&self, chat_history: Vec<ChatMessage>, message: &str) -> ConversationContext {
        ConversationContext {
            user_info: self.user_info.clone(),
            chat_history,
            current_message: message.to_string(),
            teaching_style: Some(self.teaching_style),
            emotional_state: Some(self.emotional_state),
            mastery_level: Some(self.mastery_level),
        }
    }

    /// Record progress on a topic, raising mastery by `increase` (capped at 10).
    pub fn record_progress(&mut self, topic: &str, increase: u8) {
        let now = Utc::now();
        self.learning_history.push(LearningRecord {
            timestamp: now,
            topic: topic.to_string(),
            mastery_increase: increase,
        });

        if increase > 0 {
            let raised = i64::from(self.mastery_level.get()) + i64::from(increase);
            self.mastery_level = MasteryLevel::saturating(raised);
            self.user_info.mastery_level_summary = format!(
                "Level {} - {}",
                self.mastery_level,
                self.mastery_level.band()
            );
        }
        self.updated_at = now;
    }

    /// Topics from the last `limit` history entries, oldest first.
    pub fn recent_topics(&self, limit: usize) -> impl Iterator<Item = &str> {
        let skip = self.learning_history.len().saturating_sub(limit);
        self.learning_history
            .iter()
            .skip(skip)
            .map(|record| record.topic.as_str())
    }
}

/// Teaching style from a learning-style summary.
#[must_use]
pub fn infer_teaching_style(summary: &str) -> TeachingStyle {
    let summary = summary.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| summary.contains(w));

    if has(&["visual", "image"]) {
        TeachingStyle::Visual
    } else if has(&["question", "discussion"]) {
        TeachingStyle::Socratic
    } else if has(&["application", "practice"]) {
        TeachingStyle::FlippedClassroom
    } else {
        TeachingStyle::Direct
    }
}

/// Emotional state from an emotional-state summary. Defaults to focused.
#[must_use]
pub fn infer_emotional_state(summary: &str) -> EmotionalState {
    let summary = summary.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| summary.contains(w));

    if has(&["focused", "motivated"]) {
        EmotionalState::Focused
    } else if has(&["anxious", "worried"]) {
        EmotionalState::Anxious
    } else if has(&["confused", "lost"]) {
        EmotionalState::Confused
    } else if has(&["tired", "exhausted"]) {
        EmotionalState::Tired
    } else {
        EmotionalState::Focused
    }
}

/// Mastery level from a mastery summary.
///
/// An explicit "level N" wins over keywords; out-of-range numbers are
/// clamped. Defaults to 5.
#[must_use]
pub fn infer_mastery_level(summary: &str) -> MasteryLevel {
    let summary = summary.to_lowercase();

    let explicit = LEVEL_RE
        .captures(&summary)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok());

    explicit
        .or_else(|| {
            MASTERY_KEYWORDS
                .iter()
                .find(|(word, _)| summary.contains(word))
                .map(|(_, level)| *level)
        })
        .map_or(
            MasteryLevel::saturating(i64::from(DEFAULT_MASTERY)),
            MasteryLevel::saturating,
        )
}
