//! Tool schema definitions as they appear in the registry file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tutor_orchestrator_core::ParameterSet;
use url::Url;

/// Type tag of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Array,
    Object,
    Enum,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Enum => "enum",
        }
    }
}

/// Structured payloads whose contents are checked beyond their type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFormat {
    /// The six-field student profile.
    UserInfo,
    /// An array of `{role, content}` turns.
    ChatHistory,
}

/// One field of a tool schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Contextual inference the extractor applies for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceRule {
    /// `note_taking_style` from learning-style keywords.
    NoteTakingStyle,
    /// `include_examples` and `include_analogies` from the teaching style.
    InclusionFlags,
    /// `count` from the mastery band.
    CountFromMastery,
    /// `difficulty` from emotional state and mastery.
    Difficulty,
    /// `desired_depth` from emotional state and mastery.
    Depth,
}

impl InferenceRule {
    /// Parameters this rule writes.
    #[must_use]
    pub const fn targets(&self) -> &'static [&'static str] {
        match self {
            Self::NoteTakingStyle => &["note_taking_style"],
            Self::InclusionFlags => &["include_examples", "include_analogies"],
            Self::CountFromMastery => &["count"],
            Self::Difficulty => &["difficulty"],
            Self::Depth => &["desired_depth"],
        }
    }
}

/// Everything the orchestrator knows about one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub description: String,
    pub endpoint: Url,
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
    pub fields: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub inferences: Vec<InferenceRule>,
    #[serde(default)]
    pub defaults: ParameterSet,
}

impl ToolDefinition {
    /// Required fields followed by optional ones.
    pub fn schema_fields(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .map(String::as_str)
    }

    /// Whether `name` is a required or optional field.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.schema_fields().any(|field| field == name)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }
}
