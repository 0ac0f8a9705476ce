//! Classify a single message.

use serde::Serialize;
use tutor_orchestrator::{OrchestratorConfig, Pipeline};

use super::print_json;

#[derive(Serialize)]
struct Classification<'a> {
    category: &'a str,
    confidence: f64,
    suggested_tool: &'a str,
}

/// Print the category and confidence for `message`.
///
/// Uses the model fallback when `CLAUDE_API_KEY` is configured.
///
/// # Errors
///
/// Returns an error if configuration is invalid.
pub async fn run(message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = OrchestratorConfig::from_env()?;
    let pipeline = Pipeline::from_config(&config)?;

    let (category, confidence) = pipeline.classifier().classify(message).await;
    print_json(&Classification {
        category: category.as_str(),
        confidence,
        suggested_tool: category.suggested_tool(),
    })?;
    Ok(())
}
