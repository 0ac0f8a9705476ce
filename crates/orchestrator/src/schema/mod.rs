//! Tool schemas: the registry and the validator built on it.

mod definition;
mod registry;
mod validator;

use std::path::PathBuf;

use thiserror::Error;

pub use definition::{FieldFormat, FieldSpec, FieldType, InferenceRule, ToolDefinition};
pub use registry::ToolRegistry;
pub use validator::{
    SchemaValidator, ValidationCode, ValidationErrorKind, ValidationIssue, ValidationResult,
    sanitize, sanitize_value, validate_carried_context, validate_tool_response,
};

/// Errors that can occur when loading a tool registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The registry file could not be read.
    #[error("failed to read registry {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The registry is not valid YAML or does not match the expected shape.
    #[error("failed to parse registry: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The registry parsed but is internally inconsistent.
    #[error("inconsistent registry: {}", .0.join("; "))]
    Inconsistent(Vec<String>),
}
