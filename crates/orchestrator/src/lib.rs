//! Tutor Orchestrator
//!
//! Turns a student's free-text message into a validated call to one of the
//! registered educational tools.
//!
//! # Pipeline
//!
//! 1. **Classification** - keyword patterns score the message per intent
//!    category, with an optional language-model fallback
//! 2. **Extraction** - four merged passes build the tool's parameter set
//! 3. **Validation** - the parameter set is sanitized and checked against the
//!    tool's schema
//! 4. **Dispatch** - the request is POSTed to the tool's endpoint and the
//!    response normalized
//!
//! Tools are described in a YAML registry (`config/tools.yaml`); adding a tool
//! is a registry change.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod classifier;
pub mod config;
pub mod error;
pub mod extraction;
pub mod inference;
pub mod llm;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod store;
pub mod tool_client;

pub use classifier::IntentClassifier;
pub use config::{ClaudeConfig, ConfigError, OrchestratorConfig};
pub use error::OrchestratorError;
pub use extraction::{ExtractionResult, ParameterExtractor};
pub use llm::{ClaudeClient, LanguageModel, LlmError};
pub use pipeline::{Pipeline, PipelineOutcome, WorkflowState, WorkflowStatus};
pub use schema::{SchemaError, SchemaValidator, ToolRegistry, ValidationResult};
pub use session::{ConversationSession, SessionError, SessionService, StudentProfile};
pub use store::{KeyedStore, MemoryStore, StoreError};
pub use tool_client::{HttpToolClient, ToolInvoker};
