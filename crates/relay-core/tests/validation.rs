//! Validation pipeline: stage order, failure kinds, envelope shapes.

use std::collections::HashMap;

use serde_json::{json, Value};

use relay_core::{validate_message, MessageCatalog, MessageSpec, Role, ValidationError};

fn spec(code: i64, kind: Role, payload_required: bool) -> MessageSpec {
    MessageSpec {
        code,
        kind,
        payload_required,
    }
}

fn catalog() -> MessageCatalog {
    let mut messages = HashMap::new();
    messages.insert("ping".to_string(), spec(1, Role::Agent, false));
    messages.insert("statusQuery".to_string(), spec(4, Role::Agent, true));
    messages.insert("gameStarted".to_string(), spec(100, Role::GameMaster, false));
    messages.insert("moveOrder".to_string(), spec(101, Role::GameMaster, true));
    messages.insert("gameEnded".to_string(), spec(102, Role::GameMaster, false));
    messages.insert("allAgentsLeft".to_string(), spec(103, Role::GameMaster, true));
    messages.insert("errorAgentLeft".to_string(), spec(104, Role::GameMaster, true));
    messages.insert("errorGmLeft".to_string(), spec(105, Role::GameMaster, true));
    MessageCatalog::new(messages).expect("test catalog is complete")
}

fn required() -> Vec<String> {
    vec!["messageID".to_string()]
}

fn validate(raw: &[u8], role: Role, extra: &[&str]) -> Result<relay_core::Message, ValidationError> {
    validate_message(raw, &catalog(), role, &required(), extra)
}

#[test]
fn invalid_json_is_rejected_before_any_other_check() {
    let err = validate(b"invalidMessage}", Role::Agent, &[]).unwrap_err();
    assert_eq!(err, ValidationError::InvalidJson);
    assert_eq!(err.to_envelope(), json!({"error": {"details": "Invalid JSON."}}));
}

#[test]
fn non_object_json_is_rejected_as_invalid_json() {
    for raw in [&b"42"[..], b"[1,2]", b"\"hello\"", b"null"] {
        assert_eq!(
            validate(raw, Role::Agent, &[]).unwrap_err(),
            ValidationError::InvalidJson
        );
    }
}

#[test]
fn missing_properties_lists_every_missing_key() {
    // Well-formed JSON with neither messageID nor the extra agentID:
    // must report both, and must not reach identifier resolution.
    let err = validate(br#"{"field": "value"}"#, Role::GameMaster, &["agentID"]).unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingProperties(vec!["messageID".to_string(), "agentID".to_string()])
    );
    assert_eq!(
        err.to_envelope(),
        json!({"error": {
            "details": "Missing properties.",
            "missingProperties": ["messageID", "agentID"],
        }})
    );
}

#[test]
fn unknown_message_id_is_rejected_with_the_offending_value() {
    let err = validate(br#"{"messageID": 999}"#, Role::Agent, &[]).unwrap_err();
    assert_eq!(err, ValidationError::InvalidMessageId(json!(999)));
    assert_eq!(
        err.to_envelope(),
        json!({"error": {"details": "Invalid messageID.", "messageID": 999}})
    );
}

#[test]
fn non_integer_message_id_fails_identifier_resolution() {
    let err = validate(br#"{"messageID": "four"}"#, Role::Agent, &[]).unwrap_err();
    assert_eq!(err, ValidationError::InvalidMessageId(json!("four")));
}

#[test]
fn role_enforcement_is_symmetric() {
    // Agent-typed message on the controller listener.
    let err = validate(br#"{"messageID": 1}"#, Role::GameMaster, &[]).unwrap_err();
    assert_eq!(err, ValidationError::WrongConnectionType(Role::Agent));
    assert_eq!(
        err.to_envelope(),
        json!({"error": {
            "details": "This message is not permitted with your connection.",
            "permittedConnectionType": "agent",
        }})
    );

    // Controller-typed message on the agent listener.
    let err = validate(br#"{"messageID": 100}"#, Role::Agent, &[]).unwrap_err();
    assert_eq!(err, ValidationError::WrongConnectionType(Role::GameMaster));
    assert_eq!(
        err.to_envelope()["error"]["permittedConnectionType"],
        json!("gameMaster")
    );
}

#[test]
fn absent_required_payload_reports_missing_payload_property() {
    let err = validate(br#"{"messageID": 4}"#, Role::Agent, &[]).unwrap_err();
    assert_eq!(err, ValidationError::MissingProperties(vec!["payload".to_string()]));
    assert_eq!(
        err.to_envelope(),
        json!({"error": {
            "details": "Missing properties.",
            "missingProperties": ["payload"],
        }})
    );
}

#[test]
fn non_object_payload_is_a_distinct_failure() {
    for payload in ["1", "[]", "\"x\"", "null"] {
        let raw = format!(r#"{{"messageID": 4, "payload": {}}}"#, payload);
        let err = validate(raw.as_bytes(), Role::Agent, &[]).unwrap_err();
        assert_eq!(err, ValidationError::InvalidPayloadType);
        assert_eq!(
            err.to_envelope(),
            json!({"error": {"details": "Payload should be an object."}})
        );
    }
}

#[test]
fn payload_is_not_required_when_the_catalog_says_so() {
    let msg = validate(br#"{"messageID": 1}"#, Role::Agent, &[]).expect("valid message");
    assert_eq!(msg.message_id(), Some(1));
}

#[test]
fn valid_message_passes_through_unmodified() {
    let raw = br#"{"messageID": 4, "payload": {"askedAgentID": 1337}, "extra": true}"#;
    let msg = validate(raw, Role::Agent, &[]).expect("valid message");
    assert_eq!(msg.message_id(), Some(4));
    assert_eq!(msg.get("payload"), Some(&json!({"askedAgentID": 1337})));
    // Untouched fields survive re-serialization.
    let round: Value = serde_json::from_slice(&msg.to_bytes()).unwrap();
    assert_eq!(round["extra"], json!(true));
}

#[test]
fn controller_context_requires_agent_id() {
    let err = validate(br#"{"messageID": 101, "payload": {}}"#, Role::GameMaster, &["agentID"])
        .unwrap_err();
    assert_eq!(err, ValidationError::MissingProperties(vec!["agentID".to_string()]));

    let msg = validate(
        br#"{"messageID": 101, "payload": {}, "agentID": 1}"#,
        Role::GameMaster,
        &["agentID"],
    )
    .expect("valid controller message");
    assert_eq!(msg.get("agentID"), Some(&json!(1)));
}

#[test]
fn catalog_requires_the_lifecycle_entries() {
    let mut messages = HashMap::new();
    messages.insert("gameStarted".to_string(), spec(100, Role::GameMaster, false));
    let err = MessageCatalog::new(messages).unwrap_err();
    assert_eq!(err, relay_core::CatalogError::MissingEntry("gameEnded"));
}

#[test]
fn catalog_rejects_duplicate_codes() {
    let mut messages = HashMap::new();
    messages.insert("gameStarted".to_string(), spec(100, Role::GameMaster, false));
    messages.insert("gameEnded".to_string(), spec(100, Role::GameMaster, false));
    messages.insert("allAgentsLeft".to_string(), spec(103, Role::GameMaster, true));
    messages.insert("errorAgentLeft".to_string(), spec(104, Role::GameMaster, true));
    messages.insert("errorGmLeft".to_string(), spec(105, Role::GameMaster, true));
    assert_eq!(
        MessageCatalog::new(messages).unwrap_err(),
        relay_core::CatalogError::DuplicateCode(100)
    );
}
