//! relay-protocol
//!
//! Wire-level framing for the relay server.
//!
//! This crate is responsible for turning discrete message payloads into
//! framed bytes and back again. It knows nothing about JSON or message
//! semantics; those live in `relay-core`.
//!
//! - [`frame`] : length-prefixed frame codec (2-byte LE header + payload)

pub mod frame;

pub use frame::{encode, EncodeError, FrameDecoder, HEADER_LEN, MAX_PAYLOAD_LEN};
