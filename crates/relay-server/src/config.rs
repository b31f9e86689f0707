//! Configuration for the relay server.
//!
//! The message catalog and ports come from a JSON file (camelCase keys,
//! matching the shape consumed read-only by the relay):
//!
//! ```json
//! {
//!   "agentPort": 9001,
//!   "masterPort": 9002,
//!   "maxConnections": 1024,
//!   "messageRequiredProperties": ["messageID"],
//!   "messages": {
//!     "gameStarted": { "code": 100, "type": "gameMaster", "payloadRequired": false }
//!   }
//! }
//! ```
//!
//! A couple of process-level knobs can be overridden via environment
//! variables:
//!
//! - `RELAY_BIND_ADDR` (default: "0.0.0.0")
//! - `RELAY_SHUTDOWN_GRACE_MS` (default: 1000)

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use relay_core::{MessageCatalog, MessageSpec};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 1000;

/// On-disk configuration shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    agent_port: u16,
    master_port: u16,
    #[serde(default = "default_max_connections")]
    max_connections: usize,
    #[serde(default = "default_required_properties")]
    message_required_properties: Vec<String>,
    messages: HashMap<String, MessageSpec>,
}

fn default_max_connections() -> usize {
    1024
}

fn default_required_properties() -> Vec<String> {
    vec!["messageID".to_string()]
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface both listeners bind to.
    pub bind_addr: String,

    /// Port of the agent-facing listener.
    pub agent_port: u16,

    /// Port of the game-master-facing listener.
    pub master_port: u16,

    /// Cap on concurrently connected agents. The master listener is
    /// always capped at 1.
    pub max_connections: usize,

    /// Properties every inbound message must carry.
    pub required_properties: Vec<String>,

    /// The message catalog, lookup already derived.
    pub catalog: MessageCatalog,

    /// Fixed delay after teardown before `stop` reports completion,
    /// letting in-flight close events settle.
    pub shutdown_grace: Duration,
}

impl Config {
    /// Load configuration from a JSON file, applying env overrides and
    /// defaults for everything the file does not carry.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        let catalog = MessageCatalog::new(file.messages)
            .with_context(|| format!("invalid message catalog in {}", path.display()))?;

        let bind_addr =
            env::var("RELAY_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let grace_ms = read_env_or_default("RELAY_SHUTDOWN_GRACE_MS", DEFAULT_SHUTDOWN_GRACE_MS)?;

        Ok(Config {
            bind_addr,
            agent_port: file.agent_port,
            master_port: file.master_port,
            max_connections: file.max_connections,
            required_properties: file.message_required_properties,
            catalog,
            shutdown_grace: Duration::from_millis(grace_ms),
        })
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val.parse::<T>().with_context(|| format!("invalid {}", key)),
        Err(_) => Ok(default),
    }
}
