//! Central dispatcher task.
//!
//! This task exclusively owns every piece of mutable shared state — the
//! connection registry and the session state machine — and processes
//! all connection events from a single queue, one at a time. That
//! serialization is what lets the registry and state machine stay free
//! of internal locking.
//!
//! Routing policy:
//! - agent frame   → validate, tag with sender `agentID`, forward to
//!   the game master (silently dropped while no master is connected)
//! - master frame  → validate (requires `agentID`), strip `agentID`,
//!   apply any lifecycle transition, forward to the target agent
//! - validation / routing failures → error envelope back to the sender
//! - disconnects   → registry bookkeeping plus the lifecycle side
//!   effects (`allAgentsLeft`, `errorAgentLeft`, `errorGmLeft`, full
//!   shutdown)

use bytes::Bytes;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use relay_core::{
    validate_message, AgentId, ConnectionRegistry, Message, MessageCatalog, Role, SessionEffect,
    SessionEvent, SessionState,
};

use crate::types::{Event, EventRx, Observers, Peer};

/// Required-property addition for the master listener context.
const MASTER_EXTRA_PROPERTIES: [&str; 1] = ["agentID"];

pub struct Dispatcher {
    catalog: MessageCatalog,
    required_properties: Vec<String>,
    registry: ConnectionRegistry<Peer>,
    state: SessionState,
    observers: Observers,
    /// Flipped once to stop the accept loops and report shutdown.
    shutdown_tx: watch::Sender<bool>,
}

impl Dispatcher {
    pub fn new(
        catalog: MessageCatalog,
        required_properties: Vec<String>,
        observers: Observers,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        Dispatcher {
            catalog,
            required_properties,
            registry: ConnectionRegistry::new(),
            state: SessionState::Initial,
            observers,
            shutdown_tx,
        }
    }

    /// Process events until an external stop request or a lifecycle
    /// shutdown.
    pub async fn run(mut self, mut events: EventRx) {
        while let Some(event) = events.recv().await {
            match event {
                Event::AgentConnected { peer, outbound, id_tx } => {
                    self.on_agent_connected(peer, outbound, id_tx);
                }
                Event::AgentFrame { id, payload } => self.on_agent_frame(id, &payload),
                Event::AgentClosed { id } => self.on_agent_closed(id),
                Event::MasterConnected { peer, outbound } => {
                    self.on_master_connected(peer, outbound);
                }
                Event::MasterFrame { payload } => self.on_master_frame(&payload),
                Event::MasterClosed => {
                    if self.on_master_closed() {
                        break;
                    }
                }
                Event::Shutdown => {
                    info!("Stop requested, closing all connections");
                    self.shutdown();
                    break;
                }
            }
        }
        debug!("Dispatcher finished");
    }

    fn on_agent_connected(
        &mut self,
        peer: String,
        outbound: crate::types::OutboundTx,
        id_tx: tokio::sync::oneshot::Sender<AgentId>,
    ) {
        let handle = Peer {
            name: peer.clone(),
            outbound,
        };
        let id = self.registry.register_agent(handle);
        info!("Agent connected: [{}, AID: {}] ({} total)", peer, id, self.registry.agent_count());

        if id_tx.send(id).is_err() {
            // Connection task died before learning its id.
            self.registry.remove_agent(id);
        }
    }

    fn on_master_connected(&mut self, peer: String, outbound: crate::types::OutboundTx) {
        info!("Game Master connected: [GM | {}]", peer);
        self.registry.register_controller(Peer {
            name: format!("GM | {}", peer),
            outbound,
        });
    }

    fn on_agent_frame(&mut self, id: AgentId, payload: &[u8]) {
        let mut message = match validate_message(
            payload,
            &self.catalog,
            Role::Agent,
            &self.required_properties,
            &[],
        ) {
            Ok(message) => message,
            Err(err) => {
                warn!("[AID: {}] rejected message: {}", id, err);
                self.reply_to_agent(id, err.to_envelope_bytes().into());
                return;
            }
        };

        // Tag with the sender's identity before forwarding.
        message.set_agent_id(id.0);

        let Some(master) = self.registry.controller() else {
            // Deliberate policy: well-formed but no recipient yet.
            debug!("[AID: {}] no Game Master connected, dropping message", id);
            return;
        };

        debug!("[AID: {}] forwarding message {:?} to GM", id, message.message_id());
        master.send(message.to_bytes().into());

        if let Some(hook) = &self.observers.agent_message {
            hook(&message, id);
        }
    }

    fn on_master_frame(&mut self, payload: &[u8]) {
        let mut message = match validate_message(
            payload,
            &self.catalog,
            Role::GameMaster,
            &self.required_properties,
            &MASTER_EXTRA_PROPERTIES,
        ) {
            Ok(message) => message,
            Err(err) => {
                warn!("[GM] rejected message: {}", err);
                self.reply_to_master(err.to_envelope_bytes().into());
                return;
            }
        };

        // Presence is guaranteed by validation; the value may still be
        // anything JSON allows.
        let agent_id_value = message.take_agent_id().unwrap_or(Value::Null);

        let target = agent_id_value
            .as_u64()
            .map(AgentId)
            .filter(|id| self.registry.agent(*id).is_some());

        let Some(target) = target else {
            warn!("[GM] no agent {} registered", agent_id_value);
            self.reply_to_master(agent_not_found(&agent_id_value));
            return;
        };

        self.apply_lifecycle_message(&message);

        // registry membership checked above
        if let Some(peer) = self.registry.agent(target) {
            debug!("[GM] forwarding message {:?} to AID: {}", message.message_id(), target);
            peer.send(message.to_bytes().into());
        }

        if let Some(hook) = &self.observers.master_message {
            hook(&message, target);
        }
    }

    /// Advance the session on `gameStarted` / `gameEnded`.
    fn apply_lifecycle_message(&mut self, message: &Message) {
        let Some(code) = message.message_id() else {
            return;
        };

        let event = if code == self.catalog.code_of("gameStarted") {
            SessionEvent::GameStarted
        } else if code == self.catalog.code_of("gameEnded") {
            SessionEvent::GameEnded
        } else {
            return;
        };

        let before = self.state;
        self.state.apply(event);
        if before != self.state {
            info!("Session state: {:?} -> {:?}", before, self.state);
        }
    }

    fn on_agent_closed(&mut self, id: AgentId) {
        let Some(removed) = self.registry.remove_agent(id) else {
            return; // already torn down
        };
        info!(
            "Removed [{}, AID: {}] ({} agents left)",
            removed.name,
            id,
            self.registry.agent_count()
        );

        let effect = if self.registry.is_empty() {
            self.state.apply(SessionEvent::LastAgentLeft)
        } else {
            SessionEffect::None
        };

        if effect == SessionEffect::NotifyAllAgentsLeft {
            info!("Game ended and all agents left");
            let body = json!({
                "messageID": self.catalog.code_of("allAgentsLeft"),
                "payload": {},
            });
            self.reply_to_master(to_bytes(&body));
        } else if self.registry.controller().is_some() {
            let body = json!({
                "messageID": self.catalog.code_of("errorAgentLeft"),
                "agentID": id.0,
                "payload": { "agentID": id.0 },
            });
            self.reply_to_master(to_bytes(&body));
        }
    }

    /// Returns true when the dispatcher should stop.
    fn on_master_closed(&mut self) -> bool {
        if self.registry.clear_controller().is_none() {
            return false;
        }
        info!("Game Master disconnected");

        match self.state.apply(SessionEvent::ControllerLost) {
            SessionEffect::Shutdown => {
                info!("All agents already left, shutting down");
                self.shutdown();
                true
            }
            SessionEffect::BroadcastControllerLost => {
                let body = json!({
                    "messageID": self.catalog.code_of("errorGmLeft"),
                    "payload": {},
                });
                let payload = to_bytes(&body);
                for (id, peer) in self.registry.agents() {
                    debug!("Notifying AID: {} that the GM left", id);
                    peer.send(payload.clone());
                }
                false
            }
            _ => false,
        }
    }

    /// Tear down every connection and stop the accept loops. Dropping
    /// the peer handles closes each connection's outbound channel,
    /// which makes its task exit and close the socket.
    fn shutdown(&mut self) {
        let handles = self.registry.drain_all();
        info!("Disconnecting {} connection(s)", handles.len());
        drop(handles);

        if self.shutdown_tx.send(true).is_err() {
            error!("Shutdown signal has no listeners");
        }
    }

    fn reply_to_agent(&self, id: AgentId, payload: Bytes) {
        if let Some(peer) = self.registry.agent(id) {
            peer.send(payload);
        }
    }

    fn reply_to_master(&self, payload: Bytes) {
        if let Some(master) = self.registry.controller() {
            master.send(payload);
        }
    }
}

/// Routing error envelope: the addressed agent does not exist.
fn agent_not_found(agent_id: &Value) -> Bytes {
    to_bytes(&json!({
        "error": {
            "details": "Agent with given agentID does not exist.",
            "agentID": agent_id,
        }
    }))
}

fn to_bytes(value: &Value) -> Bytes {
    serde_json::to_vec(value)
        .expect("JSON object serialization is infallible")
        .into()
}
