//! relay-core
//!
//! Pure relay logic:
//! - message catalog (names, codes, sender roles, payload requirements)
//! - message type (decoded JSON unit with typed accessors)
//! - validation pipeline and its error taxonomy
//! - connection registry (agent identifiers, controller slot)
//! - session lifecycle state machine

pub mod catalog;
pub mod message;
pub mod registry;
pub mod session;
pub mod validate;

pub use catalog::{CatalogError, MessageCatalog, MessageSpec, Role};
pub use message::Message;
pub use registry::{AgentId, ConnectionRegistry};
pub use session::{SessionEffect, SessionEvent, SessionState};
pub use validate::{validate_message, ValidationError};
