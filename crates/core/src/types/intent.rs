//! Educational intent types.

use serde::{Deserialize, Serialize};

use super::tool::ParameterSet;

/// What the student is asking for.
///
/// Declaration order matters: when two categories score the same, the one
/// declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    NoteMaking,
    FlashcardGeneration,
    ConceptExplanation,
    QuizGeneration,
    Unknown,
}

impl IntentCategory {
    /// Categories the classifier scores, in tie-break order.
    pub const ALL_SCORED: &'static [Self] = &[
        Self::NoteMaking,
        Self::FlashcardGeneration,
        Self::ConceptExplanation,
        Self::QuizGeneration,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoteMaking => "note_making",
            Self::FlashcardGeneration => "flashcard_generation",
            Self::ConceptExplanation => "concept_explanation",
            Self::QuizGeneration => "quiz_generation",
            Self::Unknown => "unknown",
        }
    }

    /// The tool that serves this category.
    ///
    /// `quiz_generator` has no registered schema; requests for it fail at
    /// extraction.
    #[must_use]
    pub const fn suggested_tool(&self) -> &'static str {
        match self {
            Self::NoteMaking => "note_maker",
            Self::FlashcardGeneration => "flashcard_generator",
            Self::ConceptExplanation => "concept_explainer",
            Self::QuizGeneration => "quiz_generator",
            Self::Unknown => "unknown",
        }
    }

    /// Parameters a request in this category needs before dispatch.
    #[must_use]
    pub const fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            Self::NoteMaking => &["topic", "subject", "note_taking_style"],
            Self::FlashcardGeneration => &["topic", "count", "difficulty", "subject"],
            Self::ConceptExplanation => &["concept_to_explain", "current_topic", "desired_depth"],
            Self::QuizGeneration => &["topic", "subject", "difficulty", "count"],
            Self::Unknown => &[],
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IntentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note_making" => Ok(Self::NoteMaking),
            "flashcard_generation" => Ok(Self::FlashcardGeneration),
            "concept_explanation" => Ok(Self::ConceptExplanation),
            "quiz_generation" => Ok(Self::QuizGeneration),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("invalid intent category: {s}")),
        }
    }
}

/// The classifier's reading of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationalIntent {
    pub intent_type: IntentCategory,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub extracted_parameters: ParameterSet,
    pub missing_parameters: Vec<String>,
    pub suggested_tool: String,
}
