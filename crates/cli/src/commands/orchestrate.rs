//! Run the full pipeline for a conversation context.

use std::path::Path;

use tracing::{info, warn};
use tutor_orchestrator::{OrchestratorConfig, Pipeline};
use tutor_orchestrator_core::ConversationContext;

use super::print_json;

/// Run the pipeline and print the outcome JSON.
///
/// # Errors
///
/// Returns an error if configuration or the context file is invalid, or if the
/// run did not succeed. The outcome is printed either way.
pub async fn run(context_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = OrchestratorConfig::from_env()?;
    let pipeline = Pipeline::from_config(&config)?;

    let content = tokio::fs::read_to_string(context_path).await?;
    let context: ConversationContext = serde_json::from_str(&content)?;
    info!(
        path = %context_path.display(),
        user_id = %context.user_info.user_id,
        "Loaded conversation context"
    );

    let outcome = pipeline.run(context).await;
    print_json(&outcome)?;

    if outcome.success {
        Ok(())
    } else {
        let reason = outcome
            .error_message
            .unwrap_or_else(|| "unknown error".to_string());
        warn!(final_state = %outcome.final_state, "Orchestration did not succeed");
        Err(format!("orchestration ended in '{}': {reason}", outcome.final_state).into())
    }
}
