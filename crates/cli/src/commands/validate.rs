//! Validate a parameter set against a tool schema.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};
use tutor_orchestrator::schema::sanitize;
use tutor_orchestrator::{OrchestratorConfig, SchemaValidator};
use tutor_orchestrator_core::ParameterSet;

use super::print_json;

/// Sanitize, validate and print the result.
///
/// # Errors
///
/// Returns an error if the parameter file cannot be read or parsed, or if
/// validation fails.
pub async fn run(tool: &str, params_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = OrchestratorConfig::from_env()?;
    let validator = SchemaValidator::new(Arc::new(config.registry));

    let content = tokio::fs::read_to_string(params_path).await?;
    let params: ParameterSet = serde_json::from_str(&content)?;
    info!(path = %params_path.display(), parameters = params.len(), "Loaded parameters");

    let result = validator.validate_request(tool, &sanitize(&params));
    print_json(&result)?;

    if result.is_valid() {
        info!(%tool, "Parameters are valid");
        Ok(())
    } else {
        for issue in result.errors() {
            error!("  - {issue}");
        }
        Err(format!("{} validation errors found", result.errors().len()).into())
    }
}
