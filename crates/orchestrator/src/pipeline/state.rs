//! Workflow states and the pure transition function.
//!
//! ```text
//! start -> context_analyzed -> parameters_extracted -> request_validated
//!                           \-> parameters_filled  -/         |
//!                                                       tool_executed
//!                                                             |
//!                                                    response_formatted
//!
//! any non-terminal state -> error -> error_handled
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tutor_orchestrator_core::{
    ConversationContext, EducationalIntent, ParameterSet, ToolRequest, ToolResponse,
};

use crate::schema::ValidationIssue;

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Start,
    ContextAnalyzed,
    ParametersExtracted,
    ParametersFilled,
    RequestValidated,
    ToolExecuted,
    ResponseFormatted,
    Error,
    ErrorHandled,
}

impl WorkflowState {
    /// Every state, in workflow order.
    pub const ALL: &'static [Self] = &[
        Self::Start,
        Self::ContextAnalyzed,
        Self::ParametersExtracted,
        Self::ParametersFilled,
        Self::RequestValidated,
        Self::ToolExecuted,
        Self::ResponseFormatted,
        Self::Error,
        Self::ErrorHandled,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ContextAnalyzed => "context_analyzed",
            Self::ParametersExtracted => "parameters_extracted",
            Self::ParametersFilled => "parameters_filled",
            Self::RequestValidated => "request_validated",
            Self::ToolExecuted => "tool_executed",
            Self::ResponseFormatted => "response_formatted",
            Self::Error => "error",
            Self::ErrorHandled => "error_handled",
        }
    }

    /// No further transitions leave a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ResponseFormatted | Self::ErrorHandled)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Classification finished.
    ContextAnalyzed(EducationalIntent),
    /// Extraction left nothing missing.
    ParametersExtracted {
        parameters: ParameterSet,
        confidence: BTreeMap<String, f64>,
    },
    /// Extraction left gaps that were filled.
    ParametersFilled {
        parameters: ParameterSet,
        confidence: BTreeMap<String, f64>,
        filled: Vec<String>,
        clarifying_questions: BTreeMap<String, String>,
    },
    /// The sanitized request passed schema validation.
    RequestValidated(ToolRequest),
    /// The tool answered, successfully or not.
    ToolExecuted(ToolResponse),
    /// The outcome was assembled.
    ResponseFormatted,
    /// A stage failed.
    Failed {
        message: String,
        validation_errors: Vec<ValidationIssue>,
    },
    /// The failure was recorded.
    ErrorHandled,
}

impl Event {
    /// A stage failure with no field-level details.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            validation_errors: Vec::new(),
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::ContextAnalyzed(_) => "context_analyzed",
            Self::ParametersExtracted { .. } => "parameters_extracted",
            Self::ParametersFilled { .. } => "parameters_filled",
            Self::RequestValidated(_) => "request_validated",
            Self::ToolExecuted(_) => "tool_executed",
            Self::ResponseFormatted => "response_formatted",
            Self::Failed { .. } => "failed",
            Self::ErrorHandled => "error_handled",
        }
    }
}

/// An event arrived in a state that does not accept it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: '{event}' in state '{from}'")]
pub struct TransitionError {
    pub from: WorkflowState,
    pub event: &'static str,
}

/// Everything accumulated by a run up to its current state.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSnapshot {
    pub state: WorkflowState,
    pub context: Arc<ConversationContext>,
    pub intent: Option<EducationalIntent>,
    pub parameters: Option<ParameterSet>,
    pub parameter_confidence: BTreeMap<String, f64>,
    /// Parameters that extraction missed and the fill stage supplied.
    pub filled_parameters: Vec<String>,
    pub clarifying_questions: BTreeMap<String, String>,
    pub tool_request: Option<ToolRequest>,
    pub tool_response: Option<ToolResponse>,
    pub validation_errors: Vec<ValidationIssue>,
    pub error_message: Option<String>,
    /// Every state entered, starting with `start`.
    pub trace: Vec<WorkflowState>,
}

impl PipelineSnapshot {
    /// The initial snapshot for a context.
    #[must_use]
    pub fn new(context: Arc<ConversationContext>) -> Self {
        Self {
            state: WorkflowState::Start,
            context,
            intent: None,
            parameters: None,
            parameter_confidence: BTreeMap::new(),
            filled_parameters: Vec::new(),
            clarifying_questions: BTreeMap::new(),
            tool_request: None,
            tool_response: None,
            validation_errors: Vec::new(),
            error_message: None,
            trace: vec![WorkflowState::Start],
        }
    }

    fn enter(mut self, state: WorkflowState) -> Self {
        self.state = state;
        self.trace.push(state);
        self
    }
}

/// Apply an event to a snapshot, producing the next snapshot.
///
/// The input is never modified.
///
/// # Errors
///
/// Returns an error if the current state does not accept the event.
pub fn transition(
    snapshot: &PipelineSnapshot,
    event: Event,
) -> Result<PipelineSnapshot, TransitionError> {
    use WorkflowState as S;

    let invalid = TransitionError {
        from: snapshot.state,
        event: event.name(),
    };
    let next = snapshot.clone();

    match (snapshot.state, event) {
        (S::Start, Event::ContextAnalyzed(intent)) => Ok(PipelineSnapshot {
            intent: Some(intent),
            ..next
        }
        .enter(S::ContextAnalyzed)),

        (
            S::ContextAnalyzed,
            Event::ParametersExtracted {
                parameters,
                confidence,
            },
        ) => Ok(PipelineSnapshot {
            parameters: Some(parameters),
            parameter_confidence: confidence,
            ..next
        }
        .enter(S::ParametersExtracted)),

        (
            S::ContextAnalyzed,
            Event::ParametersFilled {
                parameters,
                confidence,
                filled,
                clarifying_questions,
            },
        ) => Ok(PipelineSnapshot {
            parameters: Some(parameters),
            parameter_confidence: confidence,
            filled_parameters: filled,
            clarifying_questions,
            ..next
        }
        .enter(S::ParametersFilled)),

        (S::ParametersExtracted | S::ParametersFilled, Event::RequestValidated(request)) => {
            Ok(PipelineSnapshot {
                tool_request: Some(request),
                ..next
            }
            .enter(S::RequestValidated))
        }

        (S::RequestValidated, Event::ToolExecuted(response)) => Ok(PipelineSnapshot {
            tool_response: Some(response),
            ..next
        }
        .enter(S::ToolExecuted)),

        (S::ToolExecuted, Event::ResponseFormatted) => Ok(next.enter(S::ResponseFormatted)),

        (
            state,
            Event::Failed {
                message,
                validation_errors,
            },
        ) if !state.is_terminal() && state != S::Error => Ok(PipelineSnapshot {
            error_message: Some(message),
            validation_errors,
            ..next
        }
        .enter(S::Error)),

        (S::Error, Event::ErrorHandled) => Ok(next.enter(S::ErrorHandled)),

        _ => Err(invalid),
    }
}
