//! Inspect the tool registry.

use serde::Serialize;
use tutor_orchestrator::OrchestratorConfig;

use super::print_json;

#[derive(Serialize)]
struct ToolSummary<'a> {
    name: &'a str,
    endpoint: String,
    description: &'a str,
    required: &'a [String],
    optional: &'a [String],
}

/// Print every registered tool with its endpoint.
///
/// # Errors
///
/// Returns an error if configuration is invalid.
pub fn list() -> Result<(), Box<dyn std::error::Error>> {
    let config = OrchestratorConfig::from_env()?;

    let tools: Vec<_> = config
        .registry
        .iter()
        .map(|(name, def)| ToolSummary {
            name,
            endpoint: def.endpoint.to_string(),
            description: &def.description,
            required: &def.required,
            optional: &def.optional,
        })
        .collect();

    print_json(&tools)?;
    Ok(())
}

/// Print the schema description for one tool.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the tool is unknown.
#[allow(clippy::print_stdout)]
pub fn schema(tool: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = OrchestratorConfig::from_env()?;
    let description = config
        .registry
        .describe(tool)
        .ok_or_else(|| format!("Unknown tool: {tool}"))?;

    println!("{description}");
    Ok(())
}
