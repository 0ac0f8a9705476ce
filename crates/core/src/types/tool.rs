//! Tool request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::conversation::ChatMessage;
use super::profile::UserInfo;

/// Parameter name to JSON value.
pub type ParameterSet = serde_json::Map<String, Value>;

/// A validated request ready to send to a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool_name: String,
    pub parameters: ParameterSet,
    pub user_info: UserInfo,
    pub chat_history: Vec<ChatMessage>,
}

impl ToolRequest {
    /// The flat JSON body tools accept: every parameter at top level, with
    /// `user_info` and `chat_history` taken from the request itself.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut body = self.parameters.clone();
        body.insert("user_info".to_string(), self.user_info.to_value());
        body.insert(
            "chat_history".to_string(),
            Value::Array(
                self.chat_history
                    .iter()
                    .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
                    .collect(),
            ),
        );
        Value::Object(body)
    }
}

/// Outcome of a tool call. Either data or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResponse", try_from = "WireResponse")]
pub enum ToolResponse {
    Success { data: Value },
    Failure { error: String, error_code: String },
}

impl ToolResponse {
    pub fn failure(error: impl Into<String>, error_code: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            error_code: error_code.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error_code, .. } => Some(error_code),
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
}

impl From<ToolResponse> for WireResponse {
    fn from(response: ToolResponse) -> Self {
        match response {
            ToolResponse::Success { data } => Self {
                success: true,
                data: Some(data),
                error: None,
                error_code: None,
            },
            ToolResponse::Failure { error, error_code } => Self {
                success: false,
                data: None,
                error: Some(error),
                error_code: Some(error_code),
            },
        }
    }
}

impl TryFrom<WireResponse> for ToolResponse {
    type Error = String;

    fn try_from(wire: WireResponse) -> Result<Self, Self::Error> {
        match (wire.success, wire.data, wire.error) {
            (true, _, Some(_)) => Err("successful response must not carry an error".to_string()),
            (true, data, None) => Ok(Self::Success {
                data: data.unwrap_or(Value::Null),
            }),
            (false, _, error) => Ok(Self::Failure {
                error: error.unwrap_or_else(|| "Unknown tool error".to_string()),
                error_code: wire.error_code.unwrap_or_else(|| "TOOL_ERROR".to_string()),
            }),
        }
    }
}
