//! Crate-level error type.
//!
//! The pipeline itself never returns this; failures during a run become part
//! of the [`PipelineOutcome`](crate::PipelineOutcome). These errors come from
//! setup (configuration, registry loading, client construction) and from the
//! session layer.

use thiserror::Error;

use crate::config::ConfigError;
use crate::extraction::ExtractionError;
use crate::llm::LlmError;
use crate::schema::SchemaError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Errors raised outside a pipeline run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Environment configuration was invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tool registry failed to load.
    #[error("Registry error: {0}")]
    Schema(#[from] SchemaError),

    /// Language model client failed.
    #[error("Model error: {0}")]
    Llm(#[from] LlmError),

    /// Tool HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyed store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Parameter extraction could not start.
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}
