//! Outbound calls to educational tools.
//!
//! Every failure is normalized into a [`ToolResponse::Failure`] with one of
//! these codes, or the code the tool itself reported:
//!
//! | Code               | Cause                                   |
//! |--------------------|-----------------------------------------|
//! | `UNKNOWN_TOOL`     | tool has no registered endpoint         |
//! | `TIMEOUT`          | no answer within the configured timeout |
//! | `CONNECTION_ERROR` | endpoint unreachable                    |
//! | `HTTP_ERROR`       | non-2xx status without an error code    |
//! | `TOOL_ERROR`       | 2xx body with `success: false`          |
//! | `CALL_ERROR`       | anything else, e.g. a non-JSON body     |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use tutor_orchestrator_core::{ToolRequest, ToolResponse};

use crate::schema::ToolRegistry;

/// Invokes a tool with a validated request.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Call the tool once. Never fails; failures are data.
    async fn call(&self, request: &ToolRequest) -> ToolResponse;
}

/// Calls tools over HTTP at their registry endpoints.
#[derive(Clone)]
pub struct HttpToolClient {
    client: reqwest::Client,
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl HttpToolClient {
    /// Create a client with a per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            registry,
            timeout,
        })
    }

    /// The `generate` URL for a tool, if it is registered.
    #[must_use]
    pub fn generate_url(&self, tool_name: &str) -> Option<String> {
        self.registry
            .endpoint(tool_name)
            .map(|endpoint| format!("{}/generate", endpoint.as_str().trim_end_matches('/')))
    }

    fn transport_failure(&self, error: &reqwest::Error) -> ToolResponse {
        if error.is_timeout() {
            ToolResponse::failure(
                format!("Tool call timed out after {}s", self.timeout.as_secs()),
                "TIMEOUT",
            )
        } else if error.is_connect() {
            ToolResponse::failure(
                format!("Could not connect to tool: {error}"),
                "CONNECTION_ERROR",
            )
        } else {
            ToolResponse::failure(format!("Tool call failed: {error}"), "CALL_ERROR")
        }
    }
}

impl std::fmt::Debug for HttpToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpToolClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolInvoker for HttpToolClient {
    #[instrument(skip(self, request), fields(tool = %request.tool_name))]
    async fn call(&self, request: &ToolRequest) -> ToolResponse {
        let Some(url) = self.generate_url(&request.tool_name) else {
            warn!("No endpoint registered for tool");
            return ToolResponse::failure(
                format!("Unknown tool: {}", request.tool_name),
                "UNKNOWN_TOOL",
            );
        };

        let response = match self.client.post(&url).json(&request.to_payload()).send().await {
            Ok(response) => response,
            Err(e) => {
                let failure = self.transport_failure(&e);
                warn!(url = %url, error = %e, code = ?failure.error_code(), "Tool call failed");
                return failure;
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return self.transport_failure(&e),
        };

        let result = interpret_response(status, &body);
        match &result {
            ToolResponse::Success { .. } => debug!(status = status.as_u16(), "Tool call succeeded"),
            ToolResponse::Failure { error, error_code } => {
                warn!(status = status.as_u16(), %error_code, %error, "Tool reported failure");
            }
        }
        result
    }
}

/// Turn a status and body into a response.
#[must_use]
pub fn interpret_response(status: StatusCode, body: &str) -> ToolResponse {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let object = parsed.as_ref().and_then(Value::as_object);
    let remote_str = |key: &str| {
        object
            .and_then(|map| map.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if !status.is_success() {
        return ToolResponse::Failure {
            error: remote_str("error").unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            error_code: remote_str("error_code").unwrap_or_else(|| "HTTP_ERROR".to_string()),
        };
    }

    let Some(map) = object else {
        return ToolResponse::failure("Tool returned a non-JSON-object body", "CALL_ERROR");
    };

    if map.get("success").and_then(Value::as_bool) == Some(false) {
        return ToolResponse::Failure {
            error: remote_str("error").unwrap_or_else(|| "Tool reported failure".to_string()),
            error_code: remote_str("error_code").unwrap_or_else(|| "TOOL_ERROR".to_string()),
        };
    }

    let mut data = map.clone();
    data.remove("success");
    ToolResponse::Success {
        data: Value::Object(data),
    }
}
