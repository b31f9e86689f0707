//! Shared types for the relay TCP server.
//!
//! This module defines:
//! - connection events flowing into the single dispatcher task
//! - channel aliases between connection tasks and the dispatcher
//! - the dispatcher-side peer handle stored in the registry
//! - optional message observer hooks for external instrumentation

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use relay_core::{AgentId, Message};

/// Outbound message payloads for one connection; the connection task
/// frames and writes them. Dropping the sender tears the connection
/// down.
pub type OutboundTx = mpsc::UnboundedSender<Bytes>;
pub type OutboundRx = mpsc::UnboundedReceiver<Bytes>;

/// One connection event. All accepts, frames, and closes from every
/// connection are funneled through a single queue of these, so the
/// dispatcher never handles two events concurrently.
#[derive(Debug)]
pub enum Event {
    /// A fresh agent connection; the dispatcher registers it and
    /// replies with the assigned identifier.
    AgentConnected {
        peer: String,
        outbound: OutboundTx,
        id_tx: oneshot::Sender<AgentId>,
    },

    /// One complete frame payload from an agent.
    AgentFrame { id: AgentId, payload: Bytes },

    /// An agent connection closed.
    AgentClosed { id: AgentId },

    /// A fresh game-master connection.
    MasterConnected { peer: String, outbound: OutboundTx },

    /// One complete frame payload from the game master.
    MasterFrame { payload: Bytes },

    /// The game-master connection closed.
    MasterClosed,

    /// External stop request.
    Shutdown,
}

pub type EventTx = mpsc::UnboundedSender<Event>;
pub type EventRx = mpsc::UnboundedReceiver<Event>;

/// What the registry stores per live connection.
#[derive(Debug)]
pub struct Peer {
    /// Human-readable connection name, for logging.
    pub name: String,
    pub outbound: OutboundTx,
}

impl Peer {
    /// Queue one payload for the connection task to frame and write.
    /// Fire-and-forget: a closed connection just drops it.
    pub fn send(&self, payload: Bytes) {
        let _ = self.outbound.send(payload);
    }
}

/// Observer invoked with a validated message and the agent it concerns.
pub type MessageObserver = Box<dyn Fn(&Message, AgentId) + Send>;

/// Optional instrumentation hooks. They see every validated message
/// after routing decisions and have no effect on relay behavior.
#[derive(Default)]
pub struct Observers {
    /// Called with each validated agent-origin message and its sender.
    pub agent_message: Option<MessageObserver>,

    /// Called with each validated, forwarded master-origin message and
    /// its target agent.
    pub master_message: Option<MessageObserver>,
}
