//! Session lifecycle state machine.
//!
//! One process-wide value covering a single game session; it is not
//! re-entrant or resettable — a new session requires a new process.
//!
//! ```text
//! Initial ──gameStarted──▶ GameStarted ──gameEnded──▶ GameEnded
//!                                │                        │
//!                       controller lost            last agent left
//!                                │                        │
//!                                ▼                        ▼
//!                      ControllerDisconnected          AllLeft
//! ```
//!
//! `ControllerDisconnected` is reachable from any non-initial,
//! non-terminal state; losing the controller in `AllLeft` shuts the
//! relay down instead. Only controller messages advance the
//! `Initial → GameStarted → GameEnded` chain.
//!
//! Transitions are expressed as `apply(event) → effect` so the
//! dispatcher can perform the side effect (notify, broadcast, shut
//! down) bound to each transition without the machine knowing about
//! connections.

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initial,
    GameStarted,
    GameEnded,
    AllLeft,
    ControllerDisconnected,
}

/// Inputs that can move the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Controller sent the catalog `gameStarted` message.
    GameStarted,
    /// Controller sent the catalog `gameEnded` message.
    GameEnded,
    /// The agent registry just became empty.
    LastAgentLeft,
    /// The controller connection closed.
    ControllerLost,
}

/// Side effect the dispatcher must perform for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    None,
    /// Send the catalog `allAgentsLeft` message to the controller.
    NotifyAllAgentsLeft,
    /// Broadcast the catalog `errorGmLeft` message to every agent.
    BroadcastControllerLost,
    /// Run the full relay shutdown sequence.
    Shutdown,
}

impl SessionState {
    /// Apply one event, returning the side effect bound to the
    /// transition. Events that do not apply in the current state leave
    /// it unchanged with no effect.
    pub fn apply(&mut self, event: SessionEvent) -> SessionEffect {
        use SessionEffect as Effect;
        use SessionEvent as Event;
        use SessionState as State;

        match (*self, event) {
            (State::Initial, Event::GameStarted) => {
                *self = State::GameStarted;
                Effect::None
            }
            (State::GameStarted, Event::GameEnded) => {
                *self = State::GameEnded;
                Effect::None
            }
            (State::GameEnded, Event::LastAgentLeft) => {
                *self = State::AllLeft;
                Effect::NotifyAllAgentsLeft
            }
            (State::AllLeft, Event::ControllerLost) => Effect::Shutdown,
            (State::Initial, Event::ControllerLost) => {
                // No agents are meaningfully affected before a session
                // starts; the slot simply opens up again.
                Effect::None
            }
            (_, Event::ControllerLost) => {
                *self = State::ControllerDisconnected;
                Effect::BroadcastControllerLost
            }
            _ => Effect::None,
        }
    }
}
