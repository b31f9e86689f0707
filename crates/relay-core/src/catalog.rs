//! Message catalog.
//!
//! The catalog is external configuration, consumed read-only: a mapping
//! from symbolic message name to its numeric code, the role permitted to
//! send it, and whether a `payload` object is required. A derived
//! `code → name` lookup gives O(1) identifier validation.
//!
//! The relay itself only ever names five entries — the session lifecycle
//! and error-notification messages — so construction fails fast when any
//! of those is missing.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

/// Catalog names the relay resolves at startup.
const REQUIRED_NAMES: [&str; 5] = [
    "gameStarted",
    "gameEnded",
    "allAgentsLeft",
    "errorAgentLeft",
    "errorGmLeft",
];

/// Which peer role is permitted to send a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Role {
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "gameMaster")]
    GameMaster,
}

impl Role {
    /// Wire spelling, as it appears in catalog files and error envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::GameMaster => "gameMaster",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSpec {
    /// Numeric message identifier (`messageID` on the wire).
    pub code: i64,

    /// Role permitted to send this message.
    #[serde(rename = "type")]
    pub kind: Role,

    /// Whether the message must carry a `payload` object.
    pub payload_required: bool,
}

/// Errors raised while building a catalog.
#[derive(Debug, PartialEq, Eq)]
pub enum CatalogError {
    /// A lifecycle entry the relay depends on is absent.
    MissingEntry(&'static str),
    /// Two entries share the same code.
    DuplicateCode(i64),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::MissingEntry(name) => {
                write!(f, "Message catalog is missing required entry '{}'", name)
            }
            CatalogError::DuplicateCode(code) => {
                write!(f, "Message catalog assigns code {} to more than one entry", code)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// The full message catalog plus its derived code lookup.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    messages: HashMap<String, MessageSpec>,
    lookup: HashMap<i64, String>,
}

impl MessageCatalog {
    /// Build a catalog, deriving the `code → name` lookup.
    pub fn new(messages: HashMap<String, MessageSpec>) -> Result<Self, CatalogError> {
        for name in REQUIRED_NAMES {
            if !messages.contains_key(name) {
                return Err(CatalogError::MissingEntry(name));
            }
        }

        let mut lookup = HashMap::with_capacity(messages.len());
        for (name, spec) in &messages {
            if lookup.insert(spec.code, name.clone()).is_some() {
                return Err(CatalogError::DuplicateCode(spec.code));
            }
        }

        Ok(MessageCatalog { messages, lookup })
    }

    /// Resolve a numeric identifier to its catalog entry.
    pub fn by_code(&self, code: i64) -> Option<&MessageSpec> {
        self.lookup.get(&code).and_then(|name| self.messages.get(name))
    }

    /// Look up an entry by symbolic name.
    pub fn by_name(&self, name: &str) -> Option<&MessageSpec> {
        self.messages.get(name)
    }

    /// Code of an entry known to exist (checked at construction).
    ///
    /// Panics if called with a name outside [`REQUIRED_NAMES`] that the
    /// catalog does not define; the relay only calls it with lifecycle
    /// names.
    pub fn code_of(&self, name: &str) -> i64 {
        self.messages
            .get(name)
            .unwrap_or_else(|| panic!("catalog entry '{}' vanished after construction", name))
            .code
    }
}
