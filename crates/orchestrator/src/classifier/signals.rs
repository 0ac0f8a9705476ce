//! Parameter signals pulled from the message and profile.

use serde_json::Value;
use tutor_orchestrator_core::{ConversationContext, ParameterSet};

use super::patterns::{COUNT_RES, SUBJECTS, TOPIC_RES};
use crate::inference::{clamp_count, infer_depth, infer_difficulty, infer_note_style};

/// Number of recent user turns searched for a topic.
const HISTORY_TURNS: usize = 3;

/// Every signal the classifier can extract, as intent parameters.
#[must_use]
pub fn extract_signals(context: &ConversationContext) -> ParameterSet {
    let message = context.current_message.to_lowercase();
    let mut params = ParameterSet::new();

    if let Some(topic) = extract_topic(context) {
        params.insert("topic".to_string(), Value::String(topic));
    }
    if let Some(subject) = extract_subject(&message) {
        params.insert("subject".to_string(), Value::String(subject));
    }

    let difficulty = infer_difficulty(context.emotional_state, context.mastery_level);
    params.insert("difficulty".to_string(), Value::from(difficulty.as_str()));

    if let Some(count) = extract_count(&message) {
        params.insert("count".to_string(), Value::from(count));
    }

    let style = infer_note_style(&context.user_info.learning_style_summary);
    params.insert("note_taking_style".to_string(), Value::from(style.as_str()));

    let depth = infer_depth(context.emotional_state, context.mastery_level);
    params.insert("desired_depth".to_string(), Value::from(depth.as_str()));

    params
}

/// Topic from the current message, else from recent user turns.
#[must_use]
pub fn extract_topic(context: &ConversationContext) -> Option<String> {
    topic_in(&context.current_message.to_lowercase()).or_else(|| {
        context
            .recent_user_turns(HISTORY_TURNS)
            .find_map(|turn| topic_in(&turn.content.to_lowercase()))
    })
}

fn topic_in(text: &str) -> Option<String> {
    TOPIC_RES.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|topic| !topic.is_empty())
    })
}

/// First vocabulary subject found in the message, title-cased.
#[must_use]
pub fn extract_subject(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    SUBJECTS
        .iter()
        .find(|subject| lower.contains(*subject))
        .map(|subject| title_case(subject))
}

/// Requested item count, clamped into the accepted range.
#[must_use]
pub fn extract_count(message: &str) -> Option<u8> {
    COUNT_RES.iter().find_map(|re| {
        re.captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| clamp_count(m.as_str().parse::<u64>().unwrap_or(u64::MAX)))
    })
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
