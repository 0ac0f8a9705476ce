//! Parameter extraction for the selected tool.
//!
//! Four passes build the parameter set:
//!
//! 1. **Intent signals** - parameters the classifier already extracted
//! 2. **Model extraction** - a JSON object from the language model, when
//!    configured
//! 3. **Contextual inference** - `user_info` and `chat_history` from the
//!    context, then the tool's registry inference rules
//! 4. **Defaults** - the tool's registry defaults
//!
//! The first pass to write a key wins, except that `user_info` and
//! `chat_history` always come from the context.

mod model;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use tutor_orchestrator_core::{ConversationContext, EducationalIntent, ParameterSet};

use crate::inference::{
    count_from_mastery, inclusion_flags, infer_depth, infer_difficulty, infer_note_style,
};
use crate::llm::LanguageModel;
use crate::schema::{InferenceRule, ToolDefinition, ToolRegistry};

pub use model::parse_json_object;

/// Label recorded on every extraction result.
pub const EXTRACTION_METHOD: &str = "hybrid";

/// Errors that stop extraction before any pass runs.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The intent names a tool the registry does not define.
    #[error("no schema registered for tool '{0}'")]
    UnknownTool(String),
}

/// Parameters for one tool plus what is still missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Schema fields only; required ones are non-null.
    pub parameters: ParameterSet,
    /// Required fields absent or null after all passes.
    pub missing: Vec<String>,
    /// Per-parameter confidence. Informational.
    pub confidence: BTreeMap<String, f64>,
    pub method: &'static str,
}

impl ExtractionResult {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Builds tool parameter sets from an intent and its context.
#[derive(Clone)]
pub struct ParameterExtractor {
    registry: Arc<ToolRegistry>,
    model: Option<Arc<dyn LanguageModel>>,
}

impl ParameterExtractor {
    #[must_use]
    pub const fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            model: None,
        }
    }

    /// Enable the model extraction pass.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Run all four passes for the intent's suggested tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry has no schema for the suggested tool.
    #[instrument(skip_all, fields(tool = %intent.suggested_tool))]
    pub async fn extract(
        &self,
        intent: &EducationalIntent,
        context: &ConversationContext,
    ) -> Result<ExtractionResult, ExtractionError> {
        let tool = intent.suggested_tool.as_str();
        let def = self
            .registry
            .get(tool)
            .ok_or_else(|| ExtractionError::UnknownTool(tool.to_string()))?;

        let mut params = intent.extracted_parameters.clone();

        if let Some(llm) = &self.model {
            let description = self.registry.describe(tool).unwrap_or_default();
            let from_model =
                model::extract_with_model(llm.as_ref(), tool, &description, context).await;
            merge_absent(&mut params, from_model);
        }

        params.insert("user_info".to_string(), context.user_info.to_value());
        params.insert("chat_history".to_string(), context.chat_history_value());
        merge_absent(&mut params, infer_from_context(def, context));

        merge_absent(&mut params, def.defaults.clone());

        let (parameters, missing) = validate(&params, def);
        let confidence = confidence(&parameters);

        debug!(
            parameters = parameters.len(),
            missing = ?missing,
            "Extracted parameters"
        );

        Ok(ExtractionResult {
            parameters,
            missing,
            confidence,
            method: EXTRACTION_METHOD,
        })
    }
}

impl std::fmt::Debug for ParameterExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterExtractor")
            .field("tools", &self.registry.names().collect::<Vec<_>>())
            .field("model", &self.model.is_some())
            .finish()
    }
}

/// Insert every entry of `incoming` whose key is not yet present.
fn merge_absent(params: &mut ParameterSet, incoming: ParameterSet) {
    for (key, value) in incoming {
        params.entry(key).or_insert(value);
    }
}

/// Apply the tool's registry inference rules.
#[must_use]
pub fn infer_from_context(def: &ToolDefinition, context: &ConversationContext) -> ParameterSet {
    let mut params = ParameterSet::new();

    for rule in &def.inferences {
        match rule {
            InferenceRule::NoteTakingStyle => {
                let style = infer_note_style(&context.user_info.learning_style_summary);
                params.insert("note_taking_style".to_string(), Value::from(style.as_str()));
            }
            InferenceRule::InclusionFlags => {
                let (examples, analogies) = inclusion_flags(context.teaching_style);
                params.insert("include_examples".to_string(), Value::Bool(examples));
                params.insert("include_analogies".to_string(), Value::Bool(analogies));
            }
            InferenceRule::CountFromMastery => {
                let count = count_from_mastery(context.mastery_level);
                params.insert("count".to_string(), Value::from(count));
            }
            InferenceRule::Difficulty => {
                let difficulty = infer_difficulty(context.emotional_state, context.mastery_level);
                params.insert("difficulty".to_string(), Value::from(difficulty.as_str()));
            }
            InferenceRule::Depth => {
                let depth = infer_depth(context.emotional_state, context.mastery_level);
                params.insert("desired_depth".to_string(), Value::from(depth.as_str()));
            }
        }
    }

    params
}

/// Keep schema fields, reporting required ones that are absent or null.
#[must_use]
pub fn validate(params: &ParameterSet, def: &ToolDefinition) -> (ParameterSet, Vec<String>) {
    let mut validated = ParameterSet::new();
    let mut missing = Vec::new();

    for field in &def.required {
        match params.get(field).filter(|v| !v.is_null()) {
            Some(value) => {
                validated.insert(field.clone(), value.clone());
            }
            None => missing.push(field.clone()),
        }
    }

    for field in &def.optional {
        if let Some(value) = params.get(field).filter(|v| !v.is_null()) {
            validated.insert(field.clone(), value.clone());
        }
    }

    (validated, missing)
}

/// Heuristic confidence per parameter.
#[must_use]
pub fn confidence(params: &ParameterSet) -> BTreeMap<String, f64> {
    params
        .iter()
        .map(|(name, value)| {
            let score = match name.as_str() {
                "user_info" | "chat_history" => 1.0,
                "topic" | "subject" => {
                    if value.as_str().is_some_and(|s| !s.trim().is_empty()) {
                        0.9
                    } else {
                        0.3
                    }
                }
                "difficulty" | "note_taking_style" | "desired_depth" => 0.7,
                "count" | "include_examples" | "include_analogies" => 0.5,
                _ => 0.6,
            };
            (name.clone(), score)
        })
        .collect()
}

/// Values for parameters still missing after extraction.
///
/// `topic` and `subject` become a clarifying question addressed to the
/// student; other known parameters get a fixed default; anything else is
/// `null`.
#[must_use]
pub fn fill_missing(missing: &[String], context: &ConversationContext) -> ParameterSet {
    let name = &context.user_info.name;
    missing
        .iter()
        .map(|param| {
            let value = match param.as_str() {
                "topic" => Value::String(format!(
                    "What specific topic would you like to focus on, {name}?"
                )),
                "subject" => Value::String(format!("What subject area is this related to, {name}?")),
                "note_taking_style" => Value::from("structured"),
                "difficulty" => Value::from("medium"),
                "count" => Value::from(10),
                "desired_depth" => Value::from("intermediate"),
                "include_examples" => Value::Bool(true),
                "include_analogies" => Value::Bool(false),
                _ => Value::Null,
            };
            (param.clone(), value)
        })
        .collect()
}

/// Parameters whose fill is a question for the student, not a default.
pub const CLARIFIED_PARAMETERS: &[&str] = &["topic", "subject"];

/// Confidence recorded for a parameter filled with a fixed default.
pub const FILLED_DEFAULT_CONFIDENCE: f64 = 0.3;

/// Gaps left by extraction and what was put in them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilledGaps {
    /// Fill values for every missing name, `null` where none is known.
    pub parameters: ParameterSet,
    /// Names that received a non-null fill, in missing-list order.
    pub filled: Vec<String>,
    /// Question text standing in for each clarified parameter.
    pub clarifying_questions: BTreeMap<String, String>,
    pub confidence: BTreeMap<String, f64>,
}

/// [`fill_missing`] plus a record of which names were filled and how.
///
/// Clarifying questions score 0.0; fixed defaults score
/// [`FILLED_DEFAULT_CONFIDENCE`].
#[must_use]
pub fn fill_gaps(missing: &[String], context: &ConversationContext) -> FilledGaps {
    let parameters = fill_missing(missing, context);
    let mut gaps = FilledGaps::default();

    for name in missing {
        let Some(value) = parameters.get(name).filter(|v| !v.is_null()) else {
            continue;
        };
        gaps.filled.push(name.clone());
        if CLARIFIED_PARAMETERS.contains(&name.as_str()) {
            if let Some(question) = value.as_str() {
                gaps.clarifying_questions.insert(name.clone(), question.to_string());
            }
            gaps.confidence.insert(name.clone(), 0.0);
        } else {
            gaps.confidence.insert(name.clone(), FILLED_DEFAULT_CONFIDENCE);
        }
    }

    gaps.parameters = parameters;
    gaps
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use tutor_orchestrator_core::{
        ChatMessage, EmotionalState, IntentCategory, MasteryLevel, TeachingStyle, UserInfo,
    };

    use super::*;
    use crate::llm::LlmError;

    struct JsonModel(&'static str);

    #[async_trait]
    impl LanguageModel for JsonModel {
        async fn complete(&self, _: &str, _: &str, _: u32) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn complete(&self, _: &str, _: &str, _: u32) -> Result<String, LlmError> {
            Err(LlmError::EmptyResponse)
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        Arc::new(ToolRegistry::builtin().unwrap())
    }

    fn context() -> ConversationContext {
        ConversationContext {
            user_info: UserInfo {
                user_id: "s9".to_string(),
                name: "Leo".to_string(),
                grade_level: "7".to_string(),
                learning_style_summary: "Enjoys a good story".to_string(),
                emotional_state_summary: "Focused".to_string(),
                mastery_level_summary: "Level 2".to_string(),
            },
            chat_history: vec![ChatMessage::user("We covered cells yesterday")],
            current_message: "make notes".to_string(),
            teaching_style: Some(TeachingStyle::Visual),
            emotional_state: Some(EmotionalState::Focused),
            mastery_level: Some(MasteryLevel::new(2).unwrap()),
        }
    }

    fn intent(category: IntentCategory, extracted: ParameterSet) -> EducationalIntent {
        EducationalIntent {
            intent_type: category,
            confidence: 0.25,
            suggested_tool: category.suggested_tool().to_string(),
            extracted_parameters: extracted,
            missing_parameters: vec![],
        }
    }

    fn set(value: Value) -> ParameterSet {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let extractor = ParameterExtractor::new(registry());
        let result = extractor
            .extract(&intent(IntentCategory::QuizGeneration, ParameterSet::new()), &context())
            .await;
        assert!(matches!(result, Err(ExtractionError::UnknownTool(tool)) if tool == "quiz_generator"));
    }

    #[tokio::test]
    async fn test_note_maker_contextual_inference() {
        let extractor = ParameterExtractor::new(registry());
        let result = extractor
            .extract(
                &intent(IntentCategory::NoteMaking, set(json!({"topic": "cells"}))),
                &context(),
            )
            .await
            .unwrap();

        assert_eq!(result.parameters["note_taking_style"], "narrative");
        assert_eq!(result.parameters["include_examples"], true);
        assert_eq!(result.parameters["include_analogies"], true);
        assert_eq!(result.parameters["user_info"]["name"], "Leo");
        assert_eq!(result.parameters["chat_history"][0]["role"], "user");
        assert_eq!(result.missing, vec!["subject"]);
        assert!(!result.is_complete());
        assert_eq!(result.method, "hybrid");
    }

    #[tokio::test]
    async fn test_first_writer_wins() {
        let extractor = ParameterExtractor::new(registry()).with_model(Arc::new(JsonModel(
            r#"Sure! {"topic": "mitosis", "subject": "Biology", "count": 3, "difficulty": null}"#,
        )));
        let result = extractor
            .extract(
                &intent(
                    IntentCategory::FlashcardGeneration,
                    set(json!({"topic": "cells", "difficulty": "hard"})),
                ),
                &context(),
            )
            .await
            .unwrap();

        assert_eq!(result.parameters["topic"], "cells");
        assert_eq!(result.parameters["subject"], "Biology");
        assert_eq!(result.parameters["count"], 3);
        assert_eq!(result.parameters["difficulty"], "hard");
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_context_overrides_model_profile() {
        let extractor = ParameterExtractor::new(registry()).with_model(Arc::new(JsonModel(
            r#"{"user_info": {"name": "Mallory"}, "subject": "History"}"#,
        )));
        let result = extractor
            .extract(
                &intent(IntentCategory::NoteMaking, set(json!({"topic": "rome"}))),
                &context(),
            )
            .await
            .unwrap();
        assert_eq!(result.parameters["user_info"]["name"], "Leo");
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_model_failure_contributes_nothing() {
        let extractor = ParameterExtractor::new(registry()).with_model(Arc::new(FailingModel));
        let result = extractor
            .extract(&intent(IntentCategory::FlashcardGeneration, ParameterSet::new()), &context())
            .await
            .unwrap();
        // Mastery 2 and focused: count from mastery band, easy difficulty.
        assert_eq!(result.parameters["count"], 5);
        assert_eq!(result.parameters["difficulty"], "easy");
        assert_eq!(result.missing, vec!["topic", "subject"]);
    }

    #[tokio::test]
    async fn test_concept_explainer_depth() {
        let mut ctx = context();
        ctx.emotional_state = Some(EmotionalState::Anxious);
        let extractor = ParameterExtractor::new(registry());
        let result = extractor
            .extract(&intent(IntentCategory::ConceptExplanation, ParameterSet::new()), &ctx)
            .await
            .unwrap();
        assert_eq!(result.parameters["desired_depth"], "basic");
        assert_eq!(result.missing, vec!["concept_to_explain", "current_topic"]);
    }

    #[test]
    fn test_validate_drops_unknown_and_nulls() {
        let registry = registry();
        let def = registry.get("flashcard_generator").unwrap();
        let (validated, missing) = validate(
            &set(json!({
                "user_info": {},
                "topic": null,
                "count": 4,
                "difficulty": "easy",
                "subject": "Math",
                "include_examples": null,
                "desired_depth": "basic"
            })),
            def,
        );
        assert_eq!(missing, vec!["topic"]);
        assert!(!validated.contains_key("desired_depth"));
        assert!(!validated.contains_key("include_examples"));
        assert_eq!(validated.len(), 4);
    }

    #[test]
    fn test_confidence() {
        let scores = confidence(&set(json!({
            "user_info": {},
            "topic": "",
            "subject": "Art",
            "difficulty": "easy",
            "count": 3,
            "concept_to_explain": "gravity"
        })));
        assert!((scores["user_info"] - 1.0).abs() < f64::EPSILON);
        assert!((scores["topic"] - 0.3).abs() < f64::EPSILON);
        assert!((scores["subject"] - 0.9).abs() < f64::EPSILON);
        assert!((scores["difficulty"] - 0.7).abs() < f64::EPSILON);
        assert!((scores["count"] - 0.5).abs() < f64::EPSILON);
        assert!((scores["concept_to_explain"] - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fill_missing() {
        let missing: Vec<String> = ["topic", "subject", "count", "difficulty", "current_topic"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let filled = fill_missing(&missing, &context());
        assert_eq!(
            filled["topic"],
            "What specific topic would you like to focus on, Leo?"
        );
        assert_eq!(filled["subject"], "What subject area is this related to, Leo?");
        assert_eq!(filled["count"], 10);
        assert_eq!(filled["difficulty"], "medium");
        assert!(filled["current_topic"].is_null());
    }

    #[test]
    fn test_fill_gaps_records_questions_and_defaults() {
        let missing: Vec<String> = ["topic", "count", "current_topic"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let gaps = fill_gaps(&missing, &context());

        assert_eq!(gaps.filled, vec!["topic".to_string(), "count".to_string()]);
        assert_eq!(
            gaps.clarifying_questions["topic"],
            "What specific topic would you like to focus on, Leo?"
        );
        assert!(!gaps.clarifying_questions.contains_key("count"));
        assert!(gaps.confidence["topic"].abs() < f64::EPSILON);
        assert!((gaps.confidence["count"] - FILLED_DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
        assert!(!gaps.confidence.contains_key("current_topic"));
        assert!(gaps.parameters["current_topic"].is_null());
    }
}
