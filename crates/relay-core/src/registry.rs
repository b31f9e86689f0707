//! Connection registry.
//!
//! Identity assignment and connection bookkeeping: the set of live agent
//! connections keyed by assigned identifier, plus the single (nullable)
//! controller slot.
//!
//! The registry is generic over the connection handle type `C` so this
//! crate stays transport-free; the server instantiates it with its
//! outbound channel handle.
//!
//! Not thread-safe by contract: the relay dispatcher exclusively owns
//! the registry and mutates it from a single task, so no internal
//! locking is needed.

use std::collections::BTreeMap;
use std::fmt;

/// Identifier for a registered agent connection.
///
/// Positive, assigned monotonically starting at 1, never reused within
/// a process lifetime — even after the agent is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live connections: many agents, at most one controller.
#[derive(Debug)]
pub struct ConnectionRegistry<C> {
    agents: BTreeMap<AgentId, C>,
    controller: Option<C>,
    next_agent_id: u64,
}

impl<C> ConnectionRegistry<C> {
    pub fn new() -> Self {
        ConnectionRegistry {
            agents: BTreeMap::new(),
            controller: None,
            next_agent_id: 1,
        }
    }

    /// Store an agent connection under the next unused identifier.
    pub fn register_agent(&mut self, conn: C) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        self.agents.insert(id, conn);
        id
    }

    /// Store the sole controller connection, replacing any existing one.
    ///
    /// Replacement rather than rejection is safe only because the
    /// controller listener's admission cap is 1; the registry itself
    /// does not enforce exclusivity.
    pub fn register_controller(&mut self, conn: C) {
        self.controller = Some(conn);
    }

    pub fn agent(&self, id: AgentId) -> Option<&C> {
        self.agents.get(&id)
    }

    pub fn remove_agent(&mut self, id: AgentId) -> Option<C> {
        self.agents.remove(&id)
    }

    pub fn controller(&self) -> Option<&C> {
        self.controller.as_ref()
    }

    pub fn clear_controller(&mut self) -> Option<C> {
        self.controller.take()
    }

    /// True when no agents are registered.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// All registered agents, for broadcast. Iteration order is stable
    /// (ascending identifier) but not semantically significant.
    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &C)> {
        self.agents.iter().map(|(id, conn)| (*id, conn))
    }

    /// Drain every connection handle for teardown: all agents followed
    /// by the controller, leaving the registry empty.
    pub fn drain_all(&mut self) -> Vec<C> {
        let mut handles: Vec<C> = std::mem::take(&mut self.agents).into_values().collect();
        if let Some(controller) = self.controller.take() {
            handles.push(controller);
        }
        handles
    }
}

impl<C> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
