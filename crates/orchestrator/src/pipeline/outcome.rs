//! The value a pipeline run always returns.

use std::collections::BTreeMap;

use serde::Serialize;
use tutor_orchestrator_core::{ConversationContext, EducationalIntent, ToolRequest, ToolResponse};

use super::state::{PipelineSnapshot, WorkflowState};
use crate::schema::ValidationIssue;

/// Result of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    /// The run reached `response_formatted` and the tool succeeded.
    pub success: bool,
    /// The validated request, when the run got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_request: Option<ToolRequest>,
    pub tool_response: Option<ToolResponse>,
    pub educational_intent: Option<EducationalIntent>,
    pub error_message: Option<String>,
    pub conversation_context: ConversationContext,
    pub final_state: WorkflowState,
    pub workflow_trace: Vec<WorkflowState>,
    pub parameter_confidence: BTreeMap<String, f64>,
    /// Parameters the run filled in because extraction could not find them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filled_parameters: Vec<String>,
    /// Questions to put to the student for parameters only they can answer.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub clarifying_questions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationIssue>,
}

impl PipelineOutcome {
    /// Whether the run reached the tool.
    #[must_use]
    pub fn tool_executed(&self) -> bool {
        self.workflow_trace.contains(&WorkflowState::ToolExecuted)
    }
}

impl From<PipelineSnapshot> for PipelineOutcome {
    fn from(snapshot: PipelineSnapshot) -> Self {
        let formatted = snapshot.state == WorkflowState::ResponseFormatted;
        let tool_ok = snapshot
            .tool_response
            .as_ref()
            .is_some_and(ToolResponse::is_success);

        let error_message = snapshot.error_message.or_else(|| {
            snapshot
                .tool_response
                .as_ref()
                .and_then(ToolResponse::error_message)
                .map(str::to_string)
        });

        Self {
            success: formatted && tool_ok,
            tool_request: snapshot.tool_request,
            tool_response: snapshot.tool_response,
            educational_intent: snapshot.intent,
            error_message,
            conversation_context: std::sync::Arc::unwrap_or_clone(snapshot.context),
            final_state: snapshot.state,
            workflow_trace: snapshot.trace,
            parameter_confidence: snapshot.parameter_confidence,
            filled_parameters: snapshot.filled_parameters,
            clarifying_questions: snapshot.clarifying_questions,
            validation_errors: snapshot.validation_errors,
        }
    }
}
