//! Decoded protocol message.
//!
//! A [`Message`] is one validated JSON object in flight through the
//! relay. The relay only ever touches two fields — `messageID` to route
//! and `agentID` to tag or address — so everything else is carried
//! opaquely and re-serialized verbatim when forwarded.

use serde_json::{Map, Value};

/// One decoded protocol unit: a flat JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Message(Map<String, Value>);

impl Message {
    pub fn new(fields: Map<String, Value>) -> Self {
        Message(fields)
    }

    /// The numeric `messageID`, when present and integral.
    pub fn message_id(&self) -> Option<i64> {
        self.0.get("messageID").and_then(Value::as_i64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Tag the message with its sender's agent identifier
    /// (agent → controller direction).
    pub fn set_agent_id(&mut self, id: u64) {
        self.0.insert("agentID".to_string(), Value::from(id));
    }

    /// Remove and return the `agentID` field
    /// (controller → agent direction).
    pub fn take_agent_id(&mut self) -> Option<Value> {
        self.0.remove("agentID")
    }

    /// Re-serialize for forwarding.
    pub fn to_bytes(&self) -> Vec<u8> {
        // A Map of Values cannot fail to serialize.
        serde_json::to_vec(&self.0).expect("JSON object serialization is infallible")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}
