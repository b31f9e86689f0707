//! relay-server
//!
//! Async TCP relay between one game-master connection and many agent
//! connections. Every message is framed (`relay-protocol`), validated
//! (`relay-core`), tagged with sender identity, and re-routed; the two
//! peer roles never talk to each other directly.

pub mod config;
pub mod server;
pub mod types;

// these are internal modules, not re-exported
mod connection;
mod dispatcher;

pub use config::Config;
pub use server::{start, RelayHandle};
pub use types::Observers;
