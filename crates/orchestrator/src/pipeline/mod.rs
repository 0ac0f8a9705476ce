//! Dispatch pipeline.
//!
//! A run is a sequence of immutable [`PipelineSnapshot`]s. Each stage looks at
//! the current snapshot and produces an [`Event`]; [`transition`] turns the
//! pair into the next snapshot. Runs never fail: every path ends in either
//! `response_formatted` or `error_handled`, and the final snapshot becomes a
//! [`PipelineOutcome`].

mod outcome;
mod state;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use tutor_orchestrator_core::{
    ChatMessage, ConversationContext, ParameterSet, ToolRequest, UserInfo,
};

pub use outcome::PipelineOutcome;
pub use state::{Event, PipelineSnapshot, TransitionError, WorkflowState, transition};

use crate::classifier::IntentClassifier;
use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::extraction::{ExtractionError, ParameterExtractor, fill_gaps};
use crate::llm::{ClaudeClient, LanguageModel};
use crate::schema::{
    SchemaValidator, ToolRegistry, ValidationResult, sanitize, validate_carried_context,
    validate_tool_response,
};
use crate::tool_client::{HttpToolClient, ToolInvoker};

/// Stage names in the order a successful run visits them.
pub const STAGES: &[WorkflowState] = &[
    WorkflowState::Start,
    WorkflowState::ContextAnalyzed,
    WorkflowState::ParametersExtracted,
    WorkflowState::ParametersFilled,
    WorkflowState::RequestValidated,
    WorkflowState::ToolExecuted,
    WorkflowState::ResponseFormatted,
];

/// Stage names plus the tools a pipeline can reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStatus {
    pub stages: Vec<&'static str>,
    pub tools: BTreeMap<String, String>,
    pub model_enabled: bool,
}

/// Classifier, extractor, validator and tool client wired together.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<ToolRegistry>,
    classifier: IntentClassifier,
    extractor: ParameterExtractor,
    validator: SchemaValidator,
    invoker: Arc<dyn ToolInvoker>,
    model_enabled: bool,
}

impl Pipeline {
    /// A pattern-only pipeline calling tools through `invoker`.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            extractor: ParameterExtractor::new(Arc::clone(&registry)),
            validator: SchemaValidator::new(Arc::clone(&registry)),
            registry,
            invoker,
            model_enabled: false,
        }
    }

    /// Enable the model fallbacks in classification and extraction.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.classifier = IntentClassifier::with_model(Arc::clone(&model));
        self.extractor = self.extractor.with_model(model);
        self.model_enabled = true;
        self
    }

    /// Build the HTTP tool client and, when configured, the Claude client.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be built.
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, OrchestratorError> {
        let registry = Arc::new(config.registry.clone());
        let invoker = HttpToolClient::new(Arc::clone(&registry), config.tool_timeout)?;
        let pipeline = Self::new(registry, Arc::new(invoker));

        match config.claude() {
            Some(claude) => {
                let model = ClaudeClient::new(claude)?;
                info!(model = %model.model(), "Model fallbacks enabled");
                Ok(pipeline.with_model(Arc::new(model)))
            }
            None => {
                info!("No CLAUDE_API_KEY configured, model fallbacks disabled");
                Ok(pipeline)
            }
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    #[must_use]
    pub const fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Stage names and configured tool endpoints.
    #[must_use]
    pub fn workflow_status(&self) -> WorkflowStatus {
        WorkflowStatus {
            stages: STAGES.iter().map(WorkflowState::as_str).collect(),
            tools: self
                .registry
                .iter()
                .map(|(name, def)| (name.to_string(), def.endpoint.to_string()))
                .collect(),
            model_enabled: self.model_enabled,
        }
    }

    /// Run one message through every stage.
    #[instrument(skip_all, fields(user_id = %context.user_info.user_id))]
    pub async fn run(&self, context: ConversationContext) -> PipelineOutcome {
        let mut snapshot = PipelineSnapshot::new(Arc::new(context));

        while !snapshot.state.is_terminal() {
            let event = self.next_event(&snapshot).await;
            snapshot = match transition(&snapshot, event) {
                Ok(next) => next,
                Err(e) => {
                    error!(error = %e, "Pipeline transition rejected");
                    match transition(&snapshot, Event::failed(e.to_string())) {
                        Ok(next) => next,
                        Err(_) => break,
                    }
                }
            };
            debug!(state = %snapshot.state, "Pipeline advanced");
        }

        let outcome = PipelineOutcome::from(snapshot);
        info!(
            success = outcome.success,
            final_state = %outcome.final_state,
            tool = outcome
                .educational_intent
                .as_ref()
                .map_or("", |i| i.suggested_tool.as_str()),
            "Pipeline finished"
        );
        outcome
    }

    /// Run the stage for the snapshot's state.
    async fn next_event(&self, snapshot: &PipelineSnapshot) -> Event {
        match snapshot.state {
            WorkflowState::Start => {
                Event::ContextAnalyzed(self.classifier.analyze(&snapshot.context).await)
            }
            WorkflowState::ContextAnalyzed => self.extract_parameters(snapshot).await,
            WorkflowState::ParametersExtracted | WorkflowState::ParametersFilled => {
                self.validate_request(snapshot)
            }
            WorkflowState::RequestValidated => self.execute_tool(snapshot).await,
            WorkflowState::ToolExecuted => format_response(snapshot),
            WorkflowState::Error => {
                error!(
                    error = snapshot.error_message.as_deref().unwrap_or_default(),
                    "Pipeline failed"
                );
                Event::ErrorHandled
            }
            WorkflowState::ResponseFormatted | WorkflowState::ErrorHandled => {
                Event::failed(format!("Pipeline already finished in '{}'", snapshot.state))
            }
        }
    }

    async fn extract_parameters(&self, snapshot: &PipelineSnapshot) -> Event {
        let Some(intent) = &snapshot.intent else {
            return Event::failed("No educational intent identified");
        };

        let result = match self.extractor.extract(intent, &snapshot.context).await {
            Ok(result) => result,
            Err(ExtractionError::UnknownTool(tool)) => {
                return Event::failed(format!(
                    "No tool schema available for '{tool}' ({} intent)",
                    intent.intent_type
                ));
            }
        };

        if result.is_complete() {
            return Event::ParametersExtracted {
                parameters: result.parameters,
                confidence: result.confidence,
            };
        }

        let gaps = fill_gaps(&result.missing, &snapshot.context);
        info!(
            missing = ?result.missing,
            filled = ?gaps.filled,
            questions = gaps.clarifying_questions.len(),
            "Filled missing parameters"
        );

        let mut parameters = result.parameters;
        parameters.extend(gaps.parameters);
        let mut confidence = result.confidence;
        confidence.extend(gaps.confidence);
        Event::ParametersFilled {
            parameters,
            confidence,
            filled: gaps.filled,
            clarifying_questions: gaps.clarifying_questions,
        }
    }

    fn validate_request(&self, snapshot: &PipelineSnapshot) -> Event {
        let Some(intent) = &snapshot.intent else {
            return Event::failed("No educational intent identified");
        };
        let Some(parameters) = snapshot.parameters.as_ref().filter(|p| !p.is_empty()) else {
            return Event::failed("No parameters extracted");
        };

        let tool_name = intent.suggested_tool.as_str();
        let result = self.validator.validate_request(tool_name, &sanitize(parameters));
        let summary = result.summary();

        match result {
            ValidationResult::Invalid(issues) => {
                warn!(tool = %tool_name, errors = issues.len(), "Request failed validation");
                Event::Failed {
                    message: format!("Request validation failed: {summary}"),
                    validation_errors: issues,
                }
            }
            ValidationResult::Valid(data) => {
                // Profile and history travel with every payload; check the
                // ones this tool's schema did not.
                let context = &snapshot.context;
                let mut carried = ParameterSet::new();
                if !data.contains_key("user_info") {
                    carried.insert("user_info".to_string(), context.user_info.to_value());
                }
                if !data.contains_key("chat_history") {
                    carried.insert("chat_history".to_string(), context.chat_history_value());
                }
                let carried = sanitize(&carried);

                let issues = validate_carried_context(&carried);
                if !issues.is_empty() {
                    warn!(
                        tool = %tool_name,
                        errors = issues.len(),
                        "Carried context failed validation"
                    );
                    let summary = ValidationResult::Invalid(issues.clone()).summary();
                    return Event::Failed {
                        message: format!("Request validation failed: {summary}"),
                        validation_errors: issues,
                    };
                }

                let carried_value =
                    |key: &str| data.get(key).or_else(|| carried.get(key)).cloned();
                let user_info = carried_value("user_info")
                    .and_then(|v| serde_json::from_value::<UserInfo>(v).ok())
                    .unwrap_or_else(|| context.user_info.clone());
                let chat_history = carried_value("chat_history")
                    .and_then(|v| serde_json::from_value::<Vec<ChatMessage>>(v).ok())
                    .unwrap_or_else(|| context.chat_history.clone());

                Event::RequestValidated(ToolRequest {
                    tool_name: tool_name.to_string(),
                    parameters: data,
                    user_info,
                    chat_history,
                })
            }
        }
    }

    async fn execute_tool(&self, snapshot: &PipelineSnapshot) -> Event {
        let Some(request) = &snapshot.tool_request else {
            return Event::failed("No validated tool request");
        };
        Event::ToolExecuted(self.invoker.call(request).await)
    }
}

fn format_response(snapshot: &PipelineSnapshot) -> Event {
    let Some(response) = &snapshot.tool_response else {
        return Event::failed("Tool produced no response");
    };

    let check = validate_tool_response(response);
    if check.is_valid() {
        Event::ResponseFormatted
    } else {
        Event::failed(format!("Malformed tool response: {}", check.summary()))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("tools", &self.registry.names().collect::<Vec<_>>())
            .field("model_enabled", &self.model_enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tutor_orchestrator_core::{
        EmotionalState, IntentCategory, MasteryLevel, ToolResponse, UserInfo,
    };

    use super::*;

    /// Records every request and answers with a canned response.
    struct RecordingInvoker {
        response: ToolResponse,
        calls: Mutex<Vec<ToolRequest>>,
    }

    impl RecordingInvoker {
        fn new(response: ToolResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<ToolRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolInvoker for RecordingInvoker {
        async fn call(&self, request: &ToolRequest) -> ToolResponse {
            self.calls.lock().unwrap().push(request.clone());
            self.response.clone()
        }
    }

    fn pipeline(invoker: Arc<RecordingInvoker>) -> Pipeline {
        Pipeline::new(Arc::new(ToolRegistry::builtin().unwrap()), invoker)
    }

    fn context(message: &str) -> ConversationContext {
        ConversationContext {
            user_info: UserInfo {
                user_id: "student-7".to_string(),
                name: "Maya".to_string(),
                grade_level: "10".to_string(),
                learning_style_summary: "Prefers worked examples".to_string(),
                emotional_state_summary: "Focused and motivated".to_string(),
                mastery_level_summary: "Level 7 proficient".to_string(),
            },
            chat_history: vec![],
            current_message: message.to_string(),
            teaching_style: None,
            emotional_state: Some(EmotionalState::Focused),
            mastery_level: Some(MasteryLevel::new(7).unwrap()),
        }
    }

    fn ok_response() -> ToolResponse {
        ToolResponse::Success {
            data: json!({ "flashcards": [{ "question": "hola", "answer": "hello" }] }),
        }
    }

    #[tokio::test]
    async fn test_flashcard_run_reaches_tool() {
        let invoker = RecordingInvoker::new(ok_response());
        let outcome = pipeline(Arc::clone(&invoker))
            .run(context("I need 15 flashcards to memorize Spanish vocabulary"))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.final_state, WorkflowState::ResponseFormatted);
        assert!(outcome.tool_executed());

        let intent = outcome.educational_intent.unwrap();
        assert_eq!(intent.intent_type, IntentCategory::FlashcardGeneration);
        assert_eq!(intent.suggested_tool, "flashcard_generator");

        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters["difficulty"], "hard");
        assert_eq!(calls[0].parameters["count"], 15);
    }

    #[tokio::test]
    async fn test_tool_failure_is_not_a_pipeline_error() {
        let invoker = RecordingInvoker::new(ToolResponse::failure("down", "CONNECTION_ERROR"));
        let outcome = pipeline(invoker)
            .run(context("Make flashcards about photosynthesis"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.final_state, WorkflowState::ResponseFormatted);
        assert_eq!(outcome.error_message.as_deref(), Some("down"));
        assert_eq!(
            outcome.tool_response.unwrap().error_code(),
            Some("CONNECTION_ERROR")
        );
    }

    #[tokio::test]
    async fn test_unknown_intent_routes_to_error() {
        let invoker = RecordingInvoker::new(ok_response());
        let outcome = pipeline(Arc::clone(&invoker)).run(context("hello there")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.final_state, WorkflowState::ErrorHandled);
        assert_eq!(
            outcome.workflow_trace,
            vec![
                WorkflowState::Start,
                WorkflowState::ContextAnalyzed,
                WorkflowState::Error,
                WorkflowState::ErrorHandled
            ]
        );
        assert!(outcome.error_message.unwrap().contains("unknown"));
        assert!(outcome.educational_intent.is_some());
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_parameters_are_filled() {
        let invoker = RecordingInvoker::new(ok_response());
        let outcome = pipeline(Arc::clone(&invoker))
            .run(context("Please help me take notes"))
            .await;

        assert!(outcome.workflow_trace.contains(&WorkflowState::ParametersFilled));
        assert!(outcome.success);
        let calls = invoker.calls();
        let topic = calls[0].parameters["topic"].as_str().unwrap();
        assert!(topic.contains("Maya"));

        assert!(outcome.filled_parameters.contains(&"topic".to_string()));
        assert!(outcome.filled_parameters.contains(&"subject".to_string()));
        assert_eq!(outcome.clarifying_questions["topic"], topic);
        assert!(outcome.clarifying_questions["subject"].contains("Maya"));
        assert!(outcome.parameter_confidence["topic"].abs() < f64::EPSILON);

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["clarifying_questions"]["subject"].is_string());
        assert!(json["filled_parameters"].is_array());
    }

    #[tokio::test]
    async fn test_complete_extraction_skips_fill() {
        let invoker = RecordingInvoker::new(ok_response());
        let outcome = pipeline(Arc::clone(&invoker))
            .run(context("make notes about photosynthesis in biology"))
            .await;

        assert!(outcome.success);
        assert!(outcome.workflow_trace.contains(&WorkflowState::ParametersExtracted));
        assert!(!outcome.workflow_trace.contains(&WorkflowState::ParametersFilled));
        assert!(outcome.filled_parameters.is_empty());
        assert!(outcome.clarifying_questions.is_empty());

        let calls = invoker.calls();
        assert_eq!(calls[0].tool_name, "note_maker");
        assert_eq!(calls[0].parameters["topic"], "photosynthesis");
        assert_eq!(calls[0].parameters["subject"], "Biology");
    }

    #[tokio::test]
    async fn test_history_is_checked_for_tools_without_history_field() {
        let mut ctx = context("I need 15 flashcards to memorize Spanish vocabulary");
        ctx.chat_history = (0..60)
            .map(|i| ChatMessage::user(format!("turn {i}")))
            .collect();
        ctx.chat_history.push(ChatMessage::assistant(""));
        let invoker = RecordingInvoker::new(ok_response());
        let outcome = pipeline(Arc::clone(&invoker)).run(ctx).await;

        assert!(!outcome.success);
        assert_eq!(outcome.final_state, WorkflowState::ErrorHandled);
        assert!(invoker.calls().is_empty());
        let fields: Vec<_> = outcome
            .validation_errors
            .iter()
            .filter_map(|e| e.field.as_deref())
            .collect();
        assert!(fields.contains(&"chat_history"));
        assert!(fields.contains(&"chat_history[60].content"));
    }

    #[tokio::test]
    async fn test_short_history_travels_with_flashcard_request() {
        let mut ctx = context("I need 15 flashcards to memorize Spanish vocabulary");
        ctx.chat_history = vec![
            ChatMessage::user("  We covered greetings  "),
            ChatMessage::assistant("Yes, hola and adios."),
        ];
        let invoker = RecordingInvoker::new(ok_response());
        let outcome = pipeline(Arc::clone(&invoker)).run(ctx).await;

        assert!(outcome.success);
        let calls = invoker.calls();
        assert_eq!(calls[0].chat_history.len(), 2);
        assert_eq!(calls[0].chat_history[0].content, "We covered greetings");
    }

    #[tokio::test]
    async fn test_malformed_tool_response_routes_to_error() {
        let invoker = RecordingInvoker::new(ToolResponse::Success { data: json!({}) });
        let outcome = pipeline(invoker)
            .run(context("Make flashcards about photosynthesis"))
            .await;

        assert_eq!(outcome.final_state, WorkflowState::ErrorHandled);
        assert!(outcome.tool_executed());
        assert!(
            outcome
                .error_message
                .unwrap()
                .starts_with("Malformed tool response")
        );
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_validation_errors() {
        let mut ctx = context("Make flashcards about photosynthesis");
        ctx.user_info.user_id = String::new();
        let invoker = RecordingInvoker::new(ok_response());
        let outcome = pipeline(Arc::clone(&invoker)).run(ctx).await;

        assert_eq!(outcome.final_state, WorkflowState::ErrorHandled);
        assert!(!outcome.validation_errors.is_empty());
        assert!(invoker.calls().is_empty());
    }

    #[test]
    fn test_workflow_status() {
        let status = pipeline(RecordingInvoker::new(ok_response())).workflow_status();
        assert_eq!(status.stages.first(), Some(&"start"));
        assert_eq!(status.stages.last(), Some(&"response_formatted"));
        assert_eq!(
            status.tools.get("note_maker").map(String::as_str),
            Some("http://localhost:8001/")
        );
        assert!(!status.model_enabled);
    }
}
