//! Deterministic rules that derive tool options from the student profile.
//!
//! Shared by the classifier's signal extraction and the extractor's
//! contextual pass.

use tutor_orchestrator_core::{
    DifficultyLevel, EmotionalState, ExplanationDepth, MasteryLevel, NoteTakingStyle,
    TeachingStyle,
};

/// Lowest and highest item count a tool accepts.
pub const COUNT_RANGE: (u8, u8) = (1, 20);

/// Difficulty from emotional state, then mastery.
#[must_use]
pub fn infer_difficulty(
    emotional_state: Option<EmotionalState>,
    mastery: Option<MasteryLevel>,
) -> DifficultyLevel {
    let level = mastery.map(|m| m.get());
    match emotional_state {
        Some(EmotionalState::Confused | EmotionalState::Anxious | EmotionalState::Tired) => {
            DifficultyLevel::Easy
        }
        Some(EmotionalState::Focused) => match level {
            Some(7..) => DifficultyLevel::Hard,
            Some(4..=6) => DifficultyLevel::Medium,
            _ => DifficultyLevel::Easy,
        },
        None => match level {
            Some(..=3) => DifficultyLevel::Easy,
            Some(4..=6) => DifficultyLevel::Medium,
            Some(_) => DifficultyLevel::Hard,
            None => DifficultyLevel::Medium,
        },
    }
}

/// Explanation depth from emotional state, then mastery.
#[must_use]
pub fn infer_depth(
    emotional_state: Option<EmotionalState>,
    mastery: Option<MasteryLevel>,
) -> ExplanationDepth {
    if matches!(
        emotional_state,
        Some(EmotionalState::Confused | EmotionalState::Anxious)
    ) {
        return ExplanationDepth::Basic;
    }
    match mastery.map(|m| m.get()) {
        Some(..=3) => ExplanationDepth::Basic,
        Some(4..=6) => ExplanationDepth::Intermediate,
        Some(7..=8) => ExplanationDepth::Advanced,
        Some(_) => ExplanationDepth::Comprehensive,
        None => ExplanationDepth::Intermediate,
    }
}

/// Note layout from keywords in the learning-style summary.
#[must_use]
pub fn infer_note_style(learning_style_summary: &str) -> NoteTakingStyle {
    let summary = learning_style_summary.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| summary.contains(w));

    if has(&["outline", "structured"]) {
        NoteTakingStyle::Outline
    } else if has(&["bullet", "points"]) {
        NoteTakingStyle::BulletPoints
    } else if has(&["narrative", "story"]) {
        NoteTakingStyle::Narrative
    } else {
        NoteTakingStyle::Structured
    }
}

/// Number of practice items suited to a mastery band.
#[must_use]
pub fn count_from_mastery(mastery: Option<MasteryLevel>) -> u8 {
    match mastery.map(|m| m.get()) {
        Some(..=3) => 5,
        Some(4..=6) | None => 10,
        Some(_) => 15,
    }
}

/// `(include_examples, include_analogies)` for a teaching style.
#[must_use]
pub const fn inclusion_flags(teaching_style: Option<TeachingStyle>) -> (bool, bool) {
    match teaching_style {
        Some(TeachingStyle::Visual) => (true, true),
        _ => (true, false),
    }
}

/// Clamp a requested count into [`COUNT_RANGE`].
#[must_use]
pub fn clamp_count(requested: u64) -> u8 {
    let (min, max) = COUNT_RANGE;
    u8::try_from(requested).map_or(max, |n| n.clamp(min, max))
}
