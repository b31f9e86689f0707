//! Message validation pipeline.
//!
//! Turns a raw frame payload into either a validated [`Message`] or a
//! rejection. Stages run in a fixed order and short-circuit on the first
//! failure:
//!
//! 1. decode — UTF-8 + JSON object
//! 2. required properties — `messageID` plus any caller-context extras
//!    (the controller path additionally requires `agentID`)
//! 3. identifier resolution — `messageID` must resolve in the catalog
//! 4. role permission — the entry's sender role must match the listener
//! 5. payload shape — `payload` must be a JSON object when required
//!
//! Every failure kind maps to a JSON error envelope
//! `{"error": {"details": ..., ...}}` that the relay echoes back to the
//! offending sender. A validated message is returned unmodified; tagging
//! and stripping of `agentID` happen later, in routing.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::catalog::{MessageCatalog, Role};
use crate::message::Message;

/// The closed set of validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Payload is not valid UTF-8 JSON (or not a JSON object).
    InvalidJson,
    /// One or more required properties are absent; lists every missing
    /// key, not just the first.
    MissingProperties(Vec<String>),
    /// `messageID` does not resolve in the catalog (carries the
    /// offending value, which may be a non-integer).
    InvalidMessageId(Value),
    /// The catalog entry is not permitted on this listener's role.
    WrongConnectionType(Role),
    /// `payload` is present but not a JSON object.
    InvalidPayloadType,
}

impl ValidationError {
    /// Render the error envelope sent back to the offending sender.
    pub fn to_envelope(&self) -> Value {
        let details = match self {
            ValidationError::InvalidJson => json!({
                "details": "Invalid JSON.",
            }),
            ValidationError::MissingProperties(missing) => json!({
                "details": "Missing properties.",
                "missingProperties": missing,
            }),
            ValidationError::InvalidMessageId(id) => json!({
                "details": "Invalid messageID.",
                "messageID": id,
            }),
            ValidationError::WrongConnectionType(permitted) => json!({
                "details": "This message is not permitted with your connection.",
                "permittedConnectionType": permitted.as_str(),
            }),
            ValidationError::InvalidPayloadType => json!({
                "details": "Payload should be an object.",
            }),
        };
        json!({ "error": details })
    }

    /// Envelope as wire bytes.
    pub fn to_envelope_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_envelope()).expect("JSON object serialization is infallible")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidJson => write!(f, "Invalid JSON"),
            ValidationError::MissingProperties(missing) => {
                write!(f, "Missing properties: {}", missing.join(", "))
            }
            ValidationError::InvalidMessageId(id) => write!(f, "Invalid messageID: {}", id),
            ValidationError::WrongConnectionType(permitted) => {
                write!(f, "Message permitted only for {} connections", permitted)
            }
            ValidationError::InvalidPayloadType => write!(f, "Payload is not an object"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Run the full pipeline over one raw frame payload.
///
/// - `role`: role of the listener that received the frame.
/// - `required`: globally required properties (usually `["messageID"]`).
/// - `extra_required`: caller-context additions (the controller path
///   passes `["agentID"]`).
pub fn validate_message(
    raw: &[u8],
    catalog: &MessageCatalog,
    role: Role,
    required: &[String],
    extra_required: &[&str],
) -> Result<Message, ValidationError> {
    let fields = decode(raw)?;

    check_properties(&fields, required, extra_required)?;

    let spec = resolve_id(&fields, catalog)?;

    if spec.kind != role {
        return Err(ValidationError::WrongConnectionType(spec.kind));
    }

    if spec.payload_required {
        check_payload(&fields)?;
    }

    Ok(Message::new(fields))
}

fn decode(raw: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    let parsed: Value = serde_json::from_slice(raw).map_err(|_| ValidationError::InvalidJson)?;
    match parsed {
        Value::Object(fields) => Ok(fields),
        // A bare scalar or array is syntactically JSON but not a message.
        _ => Err(ValidationError::InvalidJson),
    }
}

fn check_properties(
    fields: &Map<String, Value>,
    required: &[String],
    extra_required: &[&str],
) -> Result<(), ValidationError> {
    // `messageID` is required in every context, whatever the configured
    // global list says.
    let checklist = std::iter::once("messageID")
        .chain(required.iter().map(String::as_str).filter(|k| *k != "messageID"))
        .chain(extra_required.iter().copied());

    let mut missing: Vec<String> = Vec::new();
    for key in checklist {
        if !fields.contains_key(key) {
            missing.push(key.to_string());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingProperties(missing))
    }
}

fn resolve_id<'a>(
    fields: &Map<String, Value>,
    catalog: &'a MessageCatalog,
) -> Result<&'a crate::catalog::MessageSpec, ValidationError> {
    // Presence was checked by the properties stage.
    let raw_id = fields.get("messageID").unwrap_or(&Value::Null);

    raw_id
        .as_i64()
        .and_then(|code| catalog.by_code(code))
        .ok_or_else(|| ValidationError::InvalidMessageId(raw_id.clone()))
}

fn check_payload(fields: &Map<String, Value>) -> Result<(), ValidationError> {
    match fields.get("payload") {
        None => Err(ValidationError::MissingProperties(vec!["payload".to_string()])),
        Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(ValidationError::InvalidPayloadType),
    }
}
