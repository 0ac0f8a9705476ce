//! Model-backed extraction pass.

use serde_json::Value;
use tracing::{debug, warn};
use tutor_orchestrator_core::{ConversationContext, ParameterSet};

use crate::llm::LanguageModel;

const MAX_TOKENS: u32 = 512;

const SYSTEM_PROMPT: &str = "You extract structured parameters for educational tools from \
    tutoring conversations. Respond with a single JSON object and nothing else.";

/// Ask the model for parameters. Errors and malformed replies yield an empty
/// set.
pub async fn extract_with_model(
    model: &dyn LanguageModel,
    tool: &str,
    schema_description: &str,
    context: &ConversationContext,
) -> ParameterSet {
    let prompt = format!(
        "Extract parameters for the {tool} tool from the following conversation.\n\n\
         Conversation:\n{}\n\n\
         Tool Schema:\n{schema_description}\n\
         Extract only the parameters that are clearly mentioned or can be reasonably inferred.\n\
         Return ONLY a JSON object.",
        context.transcript()
    );

    let response = match model.complete(SYSTEM_PROMPT, &prompt, MAX_TOKENS).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, tool, "Model parameter extraction failed");
            return ParameterSet::new();
        }
    };

    let Some(mut params) = parse_json_object(&response) else {
        warn!(response_len = response.len(), tool, "Model returned malformed JSON");
        return ParameterSet::new();
    };

    params.retain(|_, value| !value.is_null());
    debug!(keys = ?params.keys().collect::<Vec<_>>(), "Model extracted parameters");
    params
}

/// Parse the outermost JSON object in a reply, ignoring surrounding prose.
#[must_use]
pub fn parse_json_object(response: &str) -> Option<ParameterSet> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    let candidate = response.get(start..=end)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
