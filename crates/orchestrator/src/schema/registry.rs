//! Tool registry loaded from YAML.
//!
//! ## YAML Format
//!
//! ```yaml
//! tools:
//!   flashcard_generator:
//!     description: Generate flashcards
//!     endpoint: http://localhost:8002
//!     required: [user_info, topic, count]
//!     optional: [include_examples]
//!     fields:
//!       count: { type: integer, minimum: 1, maximum: 20 }
//!     inferences: [count_from_mastery]
//!     defaults:
//!       count: 10
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::SchemaError;
use super::definition::{FieldSpec, FieldType, ToolDefinition};

const BUILTIN_REGISTRY: &str = include_str!("../../config/tools.yaml");

/// Tool name to definition. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// The registry shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded registry fails to parse or is
    /// inconsistent.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_yaml_str(BUILTIN_REGISTRY)
    }

    /// Parse and check a registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or [`validate_registry`]
    /// reports problems.
    ///
    /// [`validate_registry`]: ToolRegistry::validate_registry
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let registry: Self = serde_yaml::from_str(yaml)?;
        let problems = registry.validate_registry();
        if !problems.is_empty() {
            return Err(SchemaError::Inconsistent(problems));
        }
        debug!(tools = registry.tools.len(), "Loaded tool registry");
        Ok(registry)
    }

    /// Read a registry file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Tool names with their definitions, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolDefinition)> {
        self.tools.iter().map(|(name, def)| (name.as_str(), def))
    }

    #[must_use]
    pub fn endpoint(&self, name: &str) -> Option<&Url> {
        self.tools.get(name).map(|def| &def.endpoint)
    }

    /// Replace a tool's endpoint. Returns `false` if the tool is unknown.
    pub fn set_endpoint(&mut self, name: &str, endpoint: Url) -> bool {
        self.tools.get_mut(name).is_some_and(|def| {
            def.endpoint = endpoint;
            true
        })
    }

    /// Check internal consistency, returning one message per problem.
    #[must_use]
    pub fn validate_registry(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.tools.is_empty() {
            errors.push("registry defines no tools".to_string());
        }

        for (name, def) in &self.tools {
            if def.description.trim().is_empty() {
                errors.push(format!("{name}: missing description"));
            }
            if !matches!(def.endpoint.scheme(), "http" | "https") {
                errors.push(format!(
                    "{name}: endpoint must be http or https (got '{}')",
                    def.endpoint.scheme()
                ));
            }

            for field in &def.required {
                if def.optional.contains(field) {
                    errors.push(format!("{name}: '{field}' is both required and optional"));
                }
            }

            for field in def.schema_fields() {
                match def.fields.get(field) {
                    Some(spec) => check_field_spec(name, field, spec, &mut errors),
                    None => errors.push(format!("{name}: field '{field}' has no type definition")),
                }
            }

            for field in def.fields.keys() {
                if !def.declares(field) {
                    errors.push(format!(
                        "{name}: field '{field}' is defined but neither required nor optional"
                    ));
                }
            }

            for rule in &def.inferences {
                for target in rule.targets() {
                    if !def.declares(target) {
                        errors.push(format!(
                            "{name}: inference {rule:?} writes undeclared field '{target}'"
                        ));
                    }
                }
            }

            for key in def.defaults.keys() {
                if !def.declares(key) {
                    errors.push(format!("{name}: default for undeclared field '{key}'"));
                }
            }
        }

        errors
    }

    /// Human-readable schema description, as handed to the language model.
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<String> {
        let def = self.tools.get(name)?;

        let mut out = format!("Tool: {name}\n{}\n", def.description);

        out.push_str("\nRequired parameters:\n");
        for field in &def.required {
            describe_field(&mut out, field, def.fields.get(field));
        }

        if !def.optional.is_empty() {
            out.push_str("\nOptional parameters:\n");
            for field in &def.optional {
                describe_field(&mut out, field, def.fields.get(field));
            }
        }

        Some(out)
    }
}

fn check_field_spec(tool: &str, field: &str, spec: &FieldSpec, errors: &mut Vec<String>) {
    if spec.field_type == FieldType::Enum && spec.values.is_empty() {
        errors.push(format!("{tool}: enum field '{field}' lists no values"));
    }
    if let (Some(min), Some(max)) = (spec.min_length, spec.max_length) {
        if min > max {
            errors.push(format!("{tool}: '{field}' min_length {min} exceeds max_length {max}"));
        }
    }
    if let (Some(min), Some(max)) = (spec.minimum, spec.maximum) {
        if min > max {
            errors.push(format!("{tool}: '{field}' minimum {min} exceeds maximum {max}"));
        }
    }
}

fn describe_field(out: &mut String, field: &str, spec: Option<&FieldSpec>) {
    let Some(spec) = spec else {
        let _ = writeln!(out, "- {field}");
        return;
    };

    let mut detail = spec.field_type.as_str().to_string();
    if !spec.values.is_empty() {
        let _ = write!(detail, ": {}", spec.values.join(" | "));
    }
    match (spec.minimum, spec.maximum) {
        (Some(min), Some(max)) => {
            let _ = write!(detail, ", {min}-{max}");
        }
        (Some(min), None) => {
            let _ = write!(detail, ", >= {min}");
        }
        (None, Some(max)) => {
            let _ = write!(detail, ", <= {max}");
        }
        (None, None) => {}
    }
    if let Some(max) = spec.max_length {
        let _ = write!(detail, ", max {max} chars");
    }

    match &spec.description {
        Some(description) => {
            let _ = writeln!(out, "- {field} ({detail}): {description}");
        }
        None => {
            let _ = writeln!(out, "- {field} ({detail})");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::definition::InferenceRule;

    #[test]
    fn test_builtin_registry_is_consistent() {
        let registry = ToolRegistry::builtin().unwrap();
        assert!(registry.validate_registry().is_empty());
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["concept_explainer", "flashcard_generator", "note_maker"]
        );
    }

    #[test]
    fn test_builtin_flashcard_schema() {
        let registry = ToolRegistry::builtin().unwrap();
        let def = registry.get("flashcard_generator").unwrap();
        assert_eq!(
            def.required,
            vec!["user_info", "topic", "count", "difficulty", "subject"]
        );
        let count = def.field("count").unwrap();
        assert_eq!((count.minimum, count.maximum), (Some(1), Some(20)));
        assert_eq!(
            def.inferences,
            vec![InferenceRule::CountFromMastery, InferenceRule::Difficulty]
        );
        assert_eq!(def.defaults["count"], 10);
    }

    #[test]
    fn test_set_endpoint() {
        let mut registry = ToolRegistry::builtin().unwrap();
        let url = Url::parse("http://127.0.0.1:9999").unwrap();
        assert!(registry.set_endpoint("note_maker", url.clone()));
        assert_eq!(registry.endpoint("note_maker"), Some(&url));
        assert!(!registry.set_endpoint("quiz_generator", url));
    }

    #[test]
    fn test_inconsistent_registry_rejected() {
        let yaml = r"
tools:
  broken:
    description: Broken tool
    endpoint: ftp://localhost
    required: [topic, level]
    optional: [topic]
    fields:
      topic: { type: string, min_length: 5, max_length: 2 }
      level: { type: enum }
    inferences: [difficulty]
    defaults:
      count: 3
";
        let Err(SchemaError::Inconsistent(problems)) = ToolRegistry::from_yaml_str(yaml) else {
            panic!("expected inconsistency");
        };
        let joined = problems.join("\n");
        assert!(joined.contains("http or https"));
        assert!(joined.contains("both required and optional"));
        assert!(joined.contains("min_length 5 exceeds max_length 2"));
        assert!(joined.contains("enum field 'level' lists no values"));
        assert!(joined.contains("undeclared field 'difficulty'"));
        assert!(joined.contains("default for undeclared field 'count'"));
    }

    #[test]
    fn test_missing_type_definition() {
        let yaml = r"
tools:
  notes:
    description: Notes
    endpoint: http://localhost:1
    required: [topic]
    fields: {}
";
        let Err(SchemaError::Inconsistent(problems)) = ToolRegistry::from_yaml_str(yaml) else {
            panic!("expected inconsistency");
        };
        assert_eq!(problems, vec!["notes: field 'topic' has no type definition"]);
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            ToolRegistry::from_yaml_str("tools: [not, a, map]"),
            Err(SchemaError::Parse(_))
        ));
    }

    #[test]
    fn test_describe() {
        let registry = ToolRegistry::builtin().unwrap();
        let text = registry.describe("flashcard_generator").unwrap();
        assert!(text.starts_with("Tool: flashcard_generator\n"));
        assert!(text.contains("- count (integer, 1-20): Number of flashcards (1-20)"));
        assert!(text.contains("- difficulty (enum: easy | medium | hard)"));
        assert!(text.contains("Optional parameters:\n- include_examples (boolean)"));
        assert!(registry.describe("quiz_generator").is_none());
    }
}
