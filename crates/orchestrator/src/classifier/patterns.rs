//! Keyword pattern tables for intent scoring and signal extraction.

use std::sync::LazyLock;

use regex::Regex;
use tutor_orchestrator_core::IntentCategory;

/// Intent patterns per category, in tie-break order.
pub const INTENT_PATTERNS: &[(IntentCategory, &[&str])] = &[
    (
        IntentCategory::NoteMaking,
        &[
            r"take notes",
            r"make notes",
            r"note taking",
            r"summarize",
            r"outline",
            r"organize",
            r"write down",
            r"document",
        ],
    ),
    (
        IntentCategory::FlashcardGeneration,
        &[
            r"flashcards",
            r"flash cards",
            r"memorize",
            r"study cards",
            r"practice",
            r"quiz",
            r"test",
            r"review",
        ],
    ),
    (
        IntentCategory::ConceptExplanation,
        &[
            r"explain",
            r"understand",
            r"what is",
            r"how does",
            r"tell me about",
            r"describe",
            r"clarify",
            r"help me understand",
        ],
    ),
    (
        IntentCategory::QuizGeneration,
        &[
            r"quiz",
            r"test",
            r"questions",
            r"practice problems",
            r"exam",
            r"assessment",
            r"challenge",
        ],
    ),
];

/// Subject vocabulary, matched in order against the lower-cased message.
pub const SUBJECTS: &[&str] = &[
    "math",
    "mathematics",
    "calculus",
    "algebra",
    "geometry",
    "science",
    "physics",
    "chemistry",
    "biology",
    "environmental science",
    "english",
    "literature",
    "writing",
    "grammar",
    "history",
    "social studies",
    "geography",
    "computer science",
    "programming",
    "coding",
];

/// Compiled intent patterns, parallel to [`INTENT_PATTERNS`].
pub static INTENT_REGEXES: LazyLock<Vec<(IntentCategory, Vec<Regex>)>> = LazyLock::new(|| {
    INTENT_PATTERNS
        .iter()
        .map(|(category, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("Invalid regex"))
                .collect();
            (*category, compiled)
        })
        .collect()
});

/// Topic patterns; the first capture group is the topic.
pub static TOPIC_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"about (.+?)(?:\s|$)",
        r"topic (.+?)(?:\s|$)",
        r"subject (.+?)(?:\s|$)",
        r"regarding (.+?)(?:\s|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});

/// Count patterns; the first capture group is the number.
pub static COUNT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+)\s*(?:flash\s*cards?|questions?|cards?|notes?|items?)",
        r"(\d+)\s*(?:of|for)",
        r"(\d+)\s*(?:more|additional)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});
