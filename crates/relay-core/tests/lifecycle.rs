//! Registry identity assignment and the session state machine.

use relay_core::{AgentId, ConnectionRegistry, SessionEffect, SessionEvent, SessionState};

#[test]
fn agent_ids_start_at_one_and_increase() {
    let mut registry: ConnectionRegistry<&str> = ConnectionRegistry::new();
    assert_eq!(registry.register_agent("a"), AgentId(1));
    assert_eq!(registry.register_agent("b"), AgentId(2));
    assert_eq!(registry.register_agent("c"), AgentId(3));
}

#[test]
fn agent_ids_are_never_reused_after_removal() {
    let mut registry: ConnectionRegistry<&str> = ConnectionRegistry::new();
    let mut seen = Vec::new();
    for round in 0..4 {
        let id = registry.register_agent("conn");
        assert!(
            seen.iter().all(|&prev| prev < id),
            "id assigned in round {} was not strictly increasing",
            round
        );
        seen.push(id);
        registry.remove_agent(id);
        assert!(registry.is_empty());
    }
}

#[test]
fn lookup_and_removal() {
    let mut registry: ConnectionRegistry<&str> = ConnectionRegistry::new();
    let id = registry.register_agent("alpha");
    assert_eq!(registry.agent(id), Some(&"alpha"));
    assert_eq!(registry.agent(AgentId(999)), None);

    assert_eq!(registry.remove_agent(id), Some("alpha"));
    assert_eq!(registry.agent(id), None);
    assert_eq!(registry.remove_agent(id), None);
}

#[test]
fn controller_slot_is_replaceable() {
    let mut registry: ConnectionRegistry<&str> = ConnectionRegistry::new();
    assert!(registry.controller().is_none());

    registry.register_controller("first");
    registry.register_controller("second");
    assert_eq!(registry.controller(), Some(&"second"));

    assert_eq!(registry.clear_controller(), Some("second"));
    assert!(registry.controller().is_none());
}

#[test]
fn broadcast_iteration_covers_all_agents() {
    let mut registry: ConnectionRegistry<u32> = ConnectionRegistry::new();
    registry.register_agent(10);
    registry.register_agent(20);
    registry.register_agent(30);
    registry.register_controller(99);

    let agents: Vec<u32> = registry.agents().map(|(_, c)| *c).collect();
    assert_eq!(agents, vec![10, 20, 30]);
}

#[test]
fn drain_all_yields_agents_then_controller_and_empties_the_registry() {
    let mut registry: ConnectionRegistry<u32> = ConnectionRegistry::new();
    registry.register_agent(10);
    registry.register_agent(20);
    registry.register_controller(99);

    assert_eq!(registry.drain_all(), vec![10, 20, 99]);
    assert!(registry.is_empty());
    assert!(registry.controller().is_none());
}

#[test]
fn happy_path_is_monotonic() {
    let mut state = SessionState::Initial;

    assert_eq!(state.apply(SessionEvent::GameStarted), SessionEffect::None);
    assert_eq!(state, SessionState::GameStarted);

    assert_eq!(state.apply(SessionEvent::GameEnded), SessionEffect::None);
    assert_eq!(state, SessionState::GameEnded);

    assert_eq!(
        state.apply(SessionEvent::LastAgentLeft),
        SessionEffect::NotifyAllAgentsLeft
    );
    assert_eq!(state, SessionState::AllLeft);
}

#[test]
fn out_of_order_lifecycle_messages_do_not_advance() {
    let mut state = SessionState::Initial;
    assert_eq!(state.apply(SessionEvent::GameEnded), SessionEffect::None);
    assert_eq!(state, SessionState::Initial);

    let mut state = SessionState::GameStarted;
    assert_eq!(state.apply(SessionEvent::GameStarted), SessionEffect::None);
    assert_eq!(state, SessionState::GameStarted);

    // Agents leaving before the game ends is not a lifecycle event.
    let mut state = SessionState::GameStarted;
    assert_eq!(state.apply(SessionEvent::LastAgentLeft), SessionEffect::None);
    assert_eq!(state, SessionState::GameStarted);
}

#[test]
fn controller_loss_before_the_game_starts_is_silent() {
    let mut state = SessionState::Initial;
    assert_eq!(state.apply(SessionEvent::ControllerLost), SessionEffect::None);
    assert_eq!(state, SessionState::Initial);
}

#[test]
fn controller_loss_mid_session_broadcasts() {
    for start in [
        SessionState::GameStarted,
        SessionState::GameEnded,
        SessionState::ControllerDisconnected,
    ] {
        let mut state = start;
        assert_eq!(
            state.apply(SessionEvent::ControllerLost),
            SessionEffect::BroadcastControllerLost
        );
        assert_eq!(state, SessionState::ControllerDisconnected);
    }
}

#[test]
fn controller_loss_after_all_left_shuts_down() {
    let mut state = SessionState::AllLeft;
    assert_eq!(state.apply(SessionEvent::ControllerLost), SessionEffect::Shutdown);
    assert_eq!(state, SessionState::AllLeft);
}
