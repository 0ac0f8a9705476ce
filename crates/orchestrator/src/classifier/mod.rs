//! Intent classification.
//!
//! Classification has two stages:
//!
//! 1. **Pattern scoring** - each category scores the fraction of its keyword
//!    patterns found in the lower-cased message
//! 2. **Model fallback** - when the best score is below 0.5 and a language
//!    model is configured, the model picks a category instead
//!
//! Classification never fails; model errors are logged and the pattern
//! result is kept.

mod patterns;
mod signals;

use std::fmt::Write;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use tutor_orchestrator_core::{
    ConversationContext, EducationalIntent, IntentCategory, ParameterSet,
};

use crate::llm::LanguageModel;

pub use patterns::{INTENT_PATTERNS, SUBJECTS};
pub use signals::{extract_count, extract_signals, extract_subject, extract_topic};

use patterns::INTENT_REGEXES;

/// Scores below this trigger the model fallback.
const LOW_CONFIDENCE: f64 = 0.5;
/// Confidence assigned to a category the model recognized.
const MODEL_CONFIDENCE: f64 = 0.8;
const MAX_TOKENS: u32 = 20;

/// Category descriptions for the model prompt.
pub const CATEGORY_DESCRIPTIONS: &[(IntentCategory, &str)] = &[
    (
        IntentCategory::NoteMaking,
        "Taking, organizing or summarizing notes on a topic",
    ),
    (
        IntentCategory::FlashcardGeneration,
        "Flashcards or memorization practice",
    ),
    (
        IntentCategory::ConceptExplanation,
        "Explaining or clarifying a concept",
    ),
    (
        IntentCategory::QuizGeneration,
        "Quizzes, tests or practice questions",
    ),
];

/// Classifies student messages into intent categories.
#[derive(Clone, Default)]
pub struct IntentClassifier {
    model: Option<Arc<dyn LanguageModel>>,
}

impl IntentClassifier {
    /// A classifier that uses only pattern scoring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A classifier with a model fallback for low-confidence messages.
    #[must_use]
    pub fn with_model(model: Arc<dyn LanguageModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Classify a message into a category with a confidence in `[0, 1]`.
    #[instrument(skip(self, message), fields(message_len = message.len()))]
    pub async fn classify(&self, message: &str) -> (IntentCategory, f64) {
        let (category, score) = score(message);

        if score < LOW_CONFIDENCE {
            if let Some(model) = &self.model {
                if let Some(recognized) = ask_model(model.as_ref(), message).await {
                    debug!(
                        category = %recognized,
                        pattern_score = score,
                        "Model fallback overrode pattern result"
                    );
                    return (recognized, MODEL_CONFIDENCE);
                }
            }
        }

        debug!(category = %category, score, "Classified by patterns");
        (category, score)
    }

    /// Classify, extract signals, map to a tool and list what is missing.
    #[instrument(skip_all, fields(user_id = %context.user_info.user_id))]
    pub async fn analyze(&self, context: &ConversationContext) -> EducationalIntent {
        let (intent_type, confidence) = self.classify(&context.current_message).await;
        let extracted_parameters = extract_signals(context);
        let missing_parameters = identify_missing(intent_type, &extracted_parameters);

        EducationalIntent {
            intent_type,
            confidence,
            suggested_tool: intent_type.suggested_tool().to_string(),
            extracted_parameters,
            missing_parameters,
        }
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("model", &self.model.is_some())
            .finish()
    }
}

/// Pattern-only scoring. Ties go to the first-declared category; a message
/// matching nothing is `Unknown` with confidence 0.
#[must_use]
pub fn score(message: &str) -> (IntentCategory, f64) {
    let lower = message.to_lowercase();
    let mut best = (IntentCategory::Unknown, 0.0_f64);

    for (category, regexes) in INTENT_REGEXES.iter() {
        let hits = regexes.iter().filter(|re| re.is_match(&lower)).count();
        #[allow(clippy::cast_precision_loss)] // pattern counts are tiny
        let score = hits as f64 / regexes.len() as f64;
        if score > best.1 {
            best = (*category, score);
        }
    }

    best
}

/// Names from the category's required list absent from `params`.
#[must_use]
pub fn identify_missing(category: IntentCategory, params: &ParameterSet) -> Vec<String> {
    category
        .required_parameters()
        .iter()
        .filter(|name| !params.contains_key(**name))
        .map(|name| (*name).to_string())
        .collect()
}

/// Ask the model for a category; `None` on error or an unknown reply.
async fn ask_model(model: &dyn LanguageModel, message: &str) -> Option<IntentCategory> {
    let prompt = format!(
        "Classify this student message. Return ONLY the category name.\n\nMessage: {message}"
    );
    match model.complete(&build_system_prompt(), &prompt, MAX_TOKENS).await {
        Ok(response) => {
            let parsed = parse_category(&response);
            if parsed.is_none() {
                debug!(response = %response, "Model returned no known category");
            }
            parsed
        }
        Err(e) => {
            warn!(error = %e, "Model intent classification failed");
            None
        }
    }
}

/// Build the system prompt listing the known categories.
fn build_system_prompt() -> String {
    let mut prompt = String::from(
        "You classify student messages sent to an educational tutor.\n\n\
         Available categories:\n",
    );

    for (category, description) in CATEGORY_DESCRIPTIONS {
        let _ = writeln!(prompt, "- {category}: {description}");
    }

    prompt.push_str("\nReturn ONLY one category name from the list.");
    prompt
}

/// Parse a category name from the model's reply.
fn parse_category(response: &str) -> Option<IntentCategory> {
    let name = response.trim().trim_matches(|c: char| c == '"' || c == '.').to_lowercase();
    name.parse::<IntentCategory>()
        .ok()
        .filter(|category| *category != IntentCategory::Unknown)
}
