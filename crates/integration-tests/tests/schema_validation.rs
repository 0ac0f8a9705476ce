//! Integration tests for the tool registry and schema validator.

use std::sync::Arc;

use serde_json::{Value, json};
use tutor_integration_tests::user_info;
use tutor_orchestrator::schema::{
    ValidationCode, sanitize, validate_tool_response,
};
use tutor_orchestrator::{SchemaError, SchemaValidator, ToolRegistry};
use tutor_orchestrator_core::{ParameterSet, ToolResponse};

fn validator() -> SchemaValidator {
    SchemaValidator::new(Arc::new(ToolRegistry::builtin().expect("registry")))
}

fn note_maker_params() -> ParameterSet {
    let Value::Object(map) = json!({
        "user_info": user_info().to_value(),
        "chat_history": [
            { "role": "user", "content": "We covered cell division today" },
            { "role": "assistant", "content": "Want notes on mitosis?" }
        ],
        "topic": "mitosis",
        "subject": "Biology",
        "note_taking_style": "outline",
        "include_examples": true
    }) else {
        unreachable!("literal is an object");
    };
    map
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn test_builtin_registry_is_consistent() {
    let registry = ToolRegistry::builtin().expect("registry");
    assert!(registry.validate_registry().is_empty());
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["concept_explainer", "flashcard_generator", "note_maker"]
    );
}

#[test]
fn test_inconsistent_registry_is_rejected() {
    let yaml = r"
tools:
  broken_tool:
    description: Lists a field it never defines
    endpoint: http://localhost:9000
    required: [topic]
    optional: []
    fields: {}
";
    let err = ToolRegistry::from_yaml_str(yaml).expect_err("should be rejected");
    let SchemaError::Inconsistent(problems) = err else {
        panic!("expected consistency problems, got {err:?}");
    };
    assert!(problems.iter().any(|p| p.contains("topic")));
}

#[test]
fn test_describe_lists_parameters() {
    let registry = ToolRegistry::builtin().expect("registry");
    let description = registry.describe("flashcard_generator").expect("known tool");
    assert!(description.contains("Required parameters:"));
    assert!(description.contains("- count"));
    assert!(registry.describe("quiz_generator").is_none());
}

// =============================================================================
// Request Validation
// =============================================================================

#[test]
fn test_compliant_note_maker_request_is_valid() {
    let result = validator().validate_request("note_maker", &note_maker_params());
    assert!(result.is_valid(), "errors: {}", result.summary());
    assert!(result.errors().is_empty());
}

#[test]
fn test_revalidating_validated_data_is_stable() {
    let validator = validator();
    let first = validator.validate_request("note_maker", &note_maker_params());
    let data = first.validated_data().expect("valid").clone();

    let second = validator.validate_request("note_maker", &data);
    let again = second.validated_data().expect("still valid");
    assert_eq!(
        data.keys().collect::<Vec<_>>(),
        again.keys().collect::<Vec<_>>()
    );
}

#[test]
fn test_missing_required_field() {
    let mut params = note_maker_params();
    params.remove("topic");

    let result = validator().validate_request("note_maker", &params);
    assert!(result.validated_data().is_none());
    assert!(
        result
            .errors()
            .iter()
            .any(|e| e.code == ValidationCode::MissingRequired && e.field.as_deref() == Some("topic"))
    );
}

#[test]
fn test_all_problems_are_reported() {
    let mut params = note_maker_params();
    params.insert("note_taking_style".to_string(), json!("doodles"));
    params.insert("include_examples".to_string(), json!("yes"));
    params.insert("topic".to_string(), json!(""));

    let result = validator().validate_request("note_maker", &params);
    let codes: Vec<_> = result.errors().iter().map(|e| e.code).collect();
    assert!(codes.contains(&ValidationCode::InvalidEnumValue));
    assert!(codes.contains(&ValidationCode::InvalidType));
    assert!(codes.contains(&ValidationCode::MinLengthViolation));
}

#[test]
fn test_chat_history_checks() {
    let mut params = note_maker_params();
    let turns: Vec<_> = (0..51)
        .map(|i| json!({ "role": "user", "content": format!("turn {i}") }))
        .collect();
    params.insert("chat_history".to_string(), Value::Array(turns));
    let result = validator().validate_request("note_maker", &params);
    assert!(
        result
            .errors()
            .iter()
            .any(|e| e.code == ValidationCode::MaxArrayLengthViolation)
    );

    params.insert(
        "chat_history".to_string(),
        json!([{ "content": "who am I" }, { "role": "user" }]),
    );
    let result = validator().validate_request("note_maker", &params);
    let codes: Vec<_> = result.errors().iter().map(|e| e.code).collect();
    assert!(codes.contains(&ValidationCode::MissingRole));
    assert!(codes.contains(&ValidationCode::MissingContent));
}

#[test]
fn test_count_bounds() {
    let mut params = ParameterSet::new();
    params.insert("user_info".to_string(), user_info().to_value());
    params.insert("topic".to_string(), json!("fractions"));
    params.insert("subject".to_string(), json!("Math"));
    params.insert("difficulty".to_string(), json!("medium"));
    params.insert("count".to_string(), json!(25));

    let result = validator().validate_request("flashcard_generator", &params);
    assert!(
        result
            .errors()
            .iter()
            .any(|e| e.code == ValidationCode::MaxValueViolation)
    );
}

#[test]
fn test_unknown_tool() {
    let result = validator().validate_request("quiz_generator", &ParameterSet::new());
    assert_eq!(result.errors()[0].code, ValidationCode::UnknownTool);
}

#[test]
fn test_sanitize_then_validate() {
    let mut params = note_maker_params();
    params.insert("topic".to_string(), json!("  mito\u{0}sis \n"));

    let clean = sanitize(&params);
    assert_eq!(clean["topic"], "mitosis");
    assert!(validator().validate_request("note_maker", &clean).is_valid());
}

#[test]
fn test_result_serializes_wire_shape() {
    let mut params = note_maker_params();
    params.remove("subject");

    let value = serde_json::to_value(validator().validate_request("note_maker", &params))
        .expect("serializes");
    assert_eq!(value["is_valid"], false);
    assert_eq!(value["validated_data"], Value::Null);
    assert_eq!(value["errors"][0]["error_code"], "MISSING_REQUIRED");
    assert_eq!(value["errors"][0]["error_type"], "missing_field");
}

// =============================================================================
// Response Validation
// =============================================================================

#[test]
fn test_tool_response_validation() {
    let ok = ToolResponse::Success {
        data: json!({ "notes": "..." }),
    };
    assert!(validate_tool_response(&ok).is_valid());

    let empty = ToolResponse::Success { data: json!({}) };
    assert!(!validate_tool_response(&empty).is_valid());

    let failure = ToolResponse::failure("", "TOOL_ERROR");
    assert!(!validate_tool_response(&failure).is_valid());
}
