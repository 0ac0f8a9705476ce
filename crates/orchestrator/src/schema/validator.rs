//! Schema validation of tool parameter sets.
//!
//! Validation never fails with `Err`: every problem is collected into a
//! [`ValidationResult`] so callers see all of them at once.

use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;
use tutor_orchestrator_core::{ParameterSet, ToolResponse};

use super::ToolRegistry;
use super::definition::{FieldFormat, FieldSpec, FieldType};

/// Bounds on the student-profile subfields: (name, min chars, max chars).
const USER_INFO_BOUNDS: &[(&str, usize, Option<usize>)] = &[
    ("user_id", 1, None),
    ("name", 1, Some(100)),
    ("grade_level", 1, None),
    ("learning_style_summary", 1, Some(500)),
    ("emotional_state_summary", 1, Some(500)),
    ("mastery_level_summary", 1, Some(500)),
];

const MAX_CHAT_HISTORY: usize = 50;
const MAX_MESSAGE_CHARS: usize = 2000;
const CHAT_ROLES: &[&str] = &["user", "assistant"];

/// Broad class of a validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    MissingField,
    InvalidType,
    ConstraintViolation,
    SchemaMismatch,
}

/// Machine-readable code for a validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    UnknownTool,
    MissingRequired,
    InvalidType,
    MinLengthViolation,
    MaxLengthViolation,
    MinValueViolation,
    MaxValueViolation,
    InvalidEnumValue,
    MaxArrayLengthViolation,
    MissingUserInfoField,
    InvalidMessageType,
    MissingRole,
    MissingContent,
}

/// One field-attributed validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "error_type")]
    pub kind: ValidationErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    #[serde(rename = "error_code")]
    pub code: ValidationCode,
}

impl ValidationIssue {
    fn new(
        kind: ValidationErrorKind,
        field: impl Into<String>,
        message: impl Into<String>,
        code: ValidationCode,
    ) -> Self {
        Self {
            kind,
            field: Some(field.into()),
            message: message.into(),
            code,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Outcome of validating a parameter set. Data only when valid.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Schema fields only, each individually constraint-valid.
    Valid(ParameterSet),
    /// Every problem found; never empty.
    Invalid(Vec<ValidationIssue>),
}

impl ValidationResult {
    fn from_issues(issues: Vec<ValidationIssue>, data: ParameterSet) -> Self {
        if issues.is_empty() {
            Self::Valid(data)
        } else {
            Self::Invalid(issues)
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationIssue] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(issues) => issues,
        }
    }

    #[must_use]
    pub const fn validated_data(&self) -> Option<&ParameterSet> {
        match self {
            Self::Valid(data) => Some(data),
            Self::Invalid(_) => None,
        }
    }

    /// One line joining every problem.
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 3)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", self.errors())?;
        state.serialize_field("validated_data", &self.validated_data())?;
        state.end()
    }
}

/// Validates parameter sets against the registry's tool schemas.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    registry: Arc<ToolRegistry>,
}

impl SchemaValidator {
    #[must_use]
    pub const fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Validate `params` for `tool_name`.
    #[must_use]
    pub fn validate_request(&self, tool_name: &str, params: &ParameterSet) -> ValidationResult {
        let Some(def) = self.registry.get(tool_name) else {
            return ValidationResult::Invalid(vec![ValidationIssue {
                kind: ValidationErrorKind::SchemaMismatch,
                field: None,
                message: format!("Unknown tool: {tool_name}"),
                code: ValidationCode::UnknownTool,
            }]);
        };

        let mut issues = Vec::new();
        let mut data = ParameterSet::new();

        for field in &def.required {
            match params.get(field).filter(|v| !v.is_null()) {
                None => issues.push(ValidationIssue::new(
                    ValidationErrorKind::MissingField,
                    field,
                    format!("Required field '{field}' is missing"),
                    ValidationCode::MissingRequired,
                )),
                Some(value) => {
                    if let Some(spec) = def.field(field) {
                        check_value(field, value, spec, &mut issues);
                    }
                    data.insert(field.clone(), value.clone());
                }
            }
        }

        for field in &def.optional {
            if let Some(value) = params.get(field).filter(|v| !v.is_null()) {
                if let Some(spec) = def.field(field) {
                    check_value(field, value, spec, &mut issues);
                }
                data.insert(field.clone(), value.clone());
            }
        }

        debug!(tool = tool_name, errors = issues.len(), "Validated request");
        ValidationResult::from_issues(issues, data)
    }
}

/// Check the student profile and chat history found in `carried`.
///
/// Every tool payload carries both, so they are checked here even for tools
/// whose schema does not declare them. Absent keys are skipped.
#[must_use]
pub fn validate_carried_context(carried: &ParameterSet) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (field, field_type, format) in [
        ("user_info", FieldType::Object, FieldFormat::UserInfo),
        ("chat_history", FieldType::Array, FieldFormat::ChatHistory),
    ] {
        if let Some(value) = carried.get(field) {
            let spec = FieldSpec {
                field_type,
                format: Some(format),
                description: None,
                min_length: None,
                max_length: None,
                minimum: None,
                maximum: None,
                max_items: None,
                values: Vec::new(),
            };
            check_value(field, value, &spec, &mut issues);
        }
    }
    issues
}

/// Trim whitespace and strip NUL bytes from every string, keeping structure.
#[must_use]
pub fn sanitize(data: &ParameterSet) -> ParameterSet {
    data.iter()
        .map(|(key, value)| (key.clone(), sanitize_value(value)))
        .collect()
}

/// [`sanitize`] for a single value.
#[must_use]
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace('\0', "").trim().to_string()),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(sanitize(map)),
        other => other.clone(),
    }
}

/// Check that a tool response is well formed: successes carry data, failures
/// carry a message.
#[must_use]
pub fn validate_tool_response(response: &ToolResponse) -> ValidationResult {
    let mut issues = Vec::new();
    match response {
        ToolResponse::Success { data } => {
            let empty = match data {
                Value::Null => true,
                Value::Object(map) => map.is_empty(),
                _ => false,
            };
            if empty {
                issues.push(ValidationIssue::new(
                    ValidationErrorKind::MissingField,
                    "data",
                    "Successful response carries no data",
                    ValidationCode::MissingRequired,
                ));
            }
        }
        ToolResponse::Failure { error, error_code } => {
            if error.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    ValidationErrorKind::MissingField,
                    "error",
                    "Failed response carries no error message",
                    ValidationCode::MissingRequired,
                ));
            }
            if error_code.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    ValidationErrorKind::MissingField,
                    "error_code",
                    "Failed response carries no error code",
                    ValidationCode::MissingRequired,
                ));
            }
        }
    }

    let mut data = ParameterSet::new();
    if let Ok(Value::Object(map)) = serde_json::to_value(response) {
        data = map;
    }
    ValidationResult::from_issues(issues, data)
}

fn check_value(field: &str, value: &Value, spec: &FieldSpec, issues: &mut Vec<ValidationIssue>) {
    match spec.field_type {
        FieldType::String => match value.as_str() {
            Some(s) => check_length(field, s, spec.min_length, spec.max_length, issues),
            None => issues.push(type_error(field, "string")),
        },
        FieldType::Integer => match value.as_i64() {
            Some(n) => check_range(field, n, spec, issues),
            None => issues.push(type_error(field, "integer")),
        },
        FieldType::Boolean => {
            if !value.is_boolean() {
                issues.push(type_error(field, "boolean"));
            }
        }
        FieldType::Enum => match value.as_str() {
            Some(s) if spec.values.iter().any(|v| v == s) => {}
            Some(s) => issues.push(ValidationIssue::new(
                ValidationErrorKind::ConstraintViolation,
                field,
                format!(
                    "Value '{s}' is not one of: {}",
                    spec.values.join(", ")
                ),
                ValidationCode::InvalidEnumValue,
            )),
            None => issues.push(type_error(field, "string")),
        },
        FieldType::Array => match value.as_array() {
            Some(items) => {
                let max_items = match spec.format {
                    Some(FieldFormat::ChatHistory) => {
                        Some(spec.max_items.unwrap_or(MAX_CHAT_HISTORY))
                    }
                    _ => spec.max_items,
                };
                if let Some(max) = max_items.filter(|max| items.len() > *max) {
                    issues.push(ValidationIssue::new(
                        ValidationErrorKind::ConstraintViolation,
                        field,
                        format!("At most {max} items allowed (got {})", items.len()),
                        ValidationCode::MaxArrayLengthViolation,
                    ));
                }
                if spec.format == Some(FieldFormat::ChatHistory) {
                    check_chat_history(field, items, issues);
                }
            }
            None => issues.push(type_error(field, "array")),
        },
        FieldType::Object => match value.as_object() {
            Some(map) => {
                if spec.format == Some(FieldFormat::UserInfo) {
                    check_user_info(field, map, issues);
                }
            }
            None => issues.push(type_error(field, "object")),
        },
    }
}

fn check_user_info(field: &str, map: &ParameterSet, issues: &mut Vec<ValidationIssue>) {
    for (name, min, max) in USER_INFO_BOUNDS {
        let path = format!("{field}.{name}");
        match map.get(*name).filter(|v| !v.is_null()) {
            None => issues.push(ValidationIssue::new(
                ValidationErrorKind::MissingField,
                &path,
                format!("Student profile is missing '{name}'"),
                ValidationCode::MissingUserInfoField,
            )),
            Some(Value::String(s)) => check_length(&path, s, Some(*min), *max, issues),
            Some(_) => issues.push(type_error(&path, "string")),
        }
    }
}

fn check_chat_history(field: &str, items: &[Value], issues: &mut Vec<ValidationIssue>) {
    for (i, item) in items.iter().enumerate() {
        let path = format!("{field}[{i}]");
        let Some(message) = item.as_object() else {
            issues.push(ValidationIssue::new(
                ValidationErrorKind::InvalidType,
                &path,
                "Chat message must be an object",
                ValidationCode::InvalidMessageType,
            ));
            continue;
        };

        match message.get("role").and_then(Value::as_str) {
            None => issues.push(ValidationIssue::new(
                ValidationErrorKind::MissingField,
                format!("{path}.role"),
                "Chat message is missing 'role'",
                ValidationCode::MissingRole,
            )),
            Some(role) if !CHAT_ROLES.contains(&role) => issues.push(ValidationIssue::new(
                ValidationErrorKind::ConstraintViolation,
                format!("{path}.role"),
                format!("Role '{role}' is not one of: user, assistant"),
                ValidationCode::InvalidEnumValue,
            )),
            Some(_) => {}
        }

        match message.get("content").and_then(Value::as_str) {
            None => issues.push(ValidationIssue::new(
                ValidationErrorKind::MissingField,
                format!("{path}.content"),
                "Chat message is missing 'content'",
                ValidationCode::MissingContent,
            )),
            Some(content) => check_length(
                &format!("{path}.content"),
                content,
                Some(1),
                Some(MAX_MESSAGE_CHARS),
                issues,
            ),
        }
    }
}

fn check_length(
    field: &str,
    s: &str,
    min: Option<usize>,
    max: Option<usize>,
    issues: &mut Vec<ValidationIssue>,
) {
    let len = s.chars().count();
    if let Some(min) = min.filter(|min| len < *min) {
        issues.push(ValidationIssue::new(
            ValidationErrorKind::ConstraintViolation,
            field,
            format!("Must be at least {min} characters (got {len})"),
            ValidationCode::MinLengthViolation,
        ));
    }
    if let Some(max) = max.filter(|max| len > *max) {
        issues.push(ValidationIssue::new(
            ValidationErrorKind::ConstraintViolation,
            field,
            format!("Must be at most {max} characters (got {len})"),
            ValidationCode::MaxLengthViolation,
        ));
    }
}

fn check_range(field: &str, n: i64, spec: &FieldSpec, issues: &mut Vec<ValidationIssue>) {
    if let Some(min) = spec.minimum.filter(|min| n < *min) {
        issues.push(ValidationIssue::new(
            ValidationErrorKind::ConstraintViolation,
            field,
            format!("Must be at least {min} (got {n})"),
            ValidationCode::MinValueViolation,
        ));
    }
    if let Some(max) = spec.maximum.filter(|max| n > *max) {
        issues.push(ValidationIssue::new(
            ValidationErrorKind::ConstraintViolation,
            field,
            format!("Must be at most {max} (got {n})"),
            ValidationCode::MaxValueViolation,
        ));
    }
}

fn type_error(field: &str, expected: &str) -> ValidationIssue {
    ValidationIssue::new(
        ValidationErrorKind::InvalidType,
        field,
        format!("Expected {expected}"),
        ValidationCode::InvalidType,
    )
}
