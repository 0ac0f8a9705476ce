//! Interactive tutoring session over stdin.

use std::path::Path;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tutor_orchestrator::{OrchestratorConfig, PipelineOutcome, SessionService};
use tutor_orchestrator_core::UserInfo;

use super::print_json;

/// What is printed for each turn.
#[derive(Serialize)]
struct TurnReport<'a> {
    session_id: &'a str,
    success: bool,
    final_state: String,
    tool: Option<&'a str>,
    error_message: Option<&'a str>,
    clarifying_questions: Vec<&'a str>,
}

impl<'a> TurnReport<'a> {
    fn new(session_id: &'a str, outcome: &'a PipelineOutcome) -> Self {
        Self {
            session_id,
            success: outcome.success,
            final_state: outcome.final_state.to_string(),
            tool: outcome
                .tool_request
                .as_ref()
                .map(|request| request.tool_name.as_str()),
            error_message: outcome.error_message.as_deref(),
            clarifying_questions: outcome
                .clarifying_questions
                .values()
                .map(String::as_str)
                .collect(),
        }
    }
}

/// Open a session for the student in `user_path` and run one turn per stdin
/// line until end of input, then print the student's recommendations.
///
/// # Errors
///
/// Returns an error if configuration or the student file is invalid, or if a
/// session operation fails. Unsuccessful turns are reported, not returned.
pub async fn run(user_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = OrchestratorConfig::from_env()?;
    let service = SessionService::from_config(&config)?;

    let content = tokio::fs::read_to_string(user_path).await?;
    let user_info: UserInfo = serde_json::from_str(&content)?;
    let user_id = user_info.user_id.clone();

    let session = service.start_session(user_info).await?;
    info!(session_id = %session.session_id, %user_id, "Chat started, one message per line");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        let outcome = service.handle_turn(&session.session_id, message).await?;
        print_json(&TurnReport::new(&session.session_id, &outcome))?;
    }

    print_json(&service.recommendations(&user_id).await?)?;
    service.end_session(&session.session_id).await?;
    Ok(())
}
