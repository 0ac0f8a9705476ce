//! Request and response bodies for the Anthropic Messages API.

use serde::{Deserialize, Serialize};

/// Request body for a single-turn completion.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub messages: Vec<Message<'a>>,
    pub temperature: f32,
}

/// A message in the request.
#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Response from the Messages API.
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub content: Vec<ContentBlock>,
}

impl CompletionResponse {
    /// Concatenated text of all text blocks, or `None` if there are none.
    pub fn text(self) -> Option<String> {
        let parts: Vec<String> = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.concat())
    }
}

/// Content block in a response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = CompletionRequest {
            model: "claude-3-5-haiku-latest",
            max_tokens: 50,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
            temperature: 0.1,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["max_tokens"], 50);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_response_text_skips_other_blocks() {
        let json = r#"{"content": [
            {"type": "thinking", "thinking": "..."},
            {"type": "text", "text": "note_"},
            {"type": "text", "text": "making"}
        ]}"#;
        let response: CompletionResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.text().as_deref(), Some("note_making"));
    }

    #[test]
    fn test_response_text_empty() {
        let response: CompletionResponse =
            serde_json::from_str(r#"{"content": []}"#).expect("deserialize");
        assert!(response.text().is_none());
    }
}
