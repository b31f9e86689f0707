//! TCP listeners and top-level relay wiring.
//!
//! This module:
//! - binds the agent-facing and master-facing listeners,
//! - spawns one accept loop per listener (with its admission cap),
//! - spawns the single dispatcher task that owns all shared state,
//! - hands back a [`RelayHandle`] once **both** listeners are bound.
//!
//! Per-connection logic lives in `connection`, routing and lifecycle in
//! `dispatcher`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::connection;
use crate::dispatcher::Dispatcher;
use crate::types::{Event, EventTx, Observers};

/// Running relay. Dropping the handle does not stop the relay; call
/// [`RelayHandle::stop`].
pub struct RelayHandle {
    agent_addr: SocketAddr,
    master_addr: SocketAddr,
    events: EventTx,
    shutdown_rx: watch::Receiver<bool>,
    grace: Duration,
}

impl RelayHandle {
    /// Actual bound address of the agent listener.
    pub fn agent_addr(&self) -> SocketAddr {
        self.agent_addr
    }

    /// Actual bound address of the game-master listener.
    pub fn master_addr(&self) -> SocketAddr {
        self.master_addr
    }

    /// Resolves once the relay has shut down (externally requested or
    /// lifecycle-driven).
    pub async fn stopped(&mut self) {
        let _ = self.shutdown_rx.wait_for(|&stopped| stopped).await;
    }

    /// Run the shutdown sequence: tear down every connection, stop the
    /// listeners, then wait a fixed grace period so in-flight close
    /// events settle.
    pub async fn stop(mut self) {
        info!("Closing gracefully...");
        let _ = self.events.send(Event::Shutdown);
        self.stopped().await;
        tokio::time::sleep(self.grace).await;
        info!("Stopped");
    }
}

/// Bind both listeners, spawn the dispatcher and accept loops, and
/// return once the relay is ready for traffic.
///
/// A bind failure on either port is logged for operator visibility;
/// the other listener's bind is still attempted before the error is
/// returned.
pub async fn start(config: Config, observers: Observers) -> anyhow::Result<RelayHandle> {
    let agent_listener = bind(&config.bind_addr, config.agent_port, "agent").await;
    let master_listener = bind(&config.bind_addr, config.master_port, "game master").await;

    let agent_listener = agent_listener?;
    let master_listener = master_listener?;

    let agent_addr = agent_listener.local_addr()?;
    let master_addr = master_listener.local_addr()?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher = Dispatcher::new(
        config.catalog.clone(),
        config.required_properties.clone(),
        observers,
        shutdown_tx,
    );
    tokio::spawn(dispatcher.run(event_rx));

    tokio::spawn(accept_agents(
        agent_listener,
        event_tx.clone(),
        config.max_connections,
        shutdown_rx.clone(),
    ));
    tokio::spawn(accept_masters(
        master_listener,
        event_tx.clone(),
        shutdown_rx.clone(),
    ));

    info!("Relay ready: agents on {}, game master on {}", agent_addr, master_addr);

    Ok(RelayHandle {
        agent_addr,
        master_addr,
        events: event_tx,
        shutdown_rx,
        grace: config.shutdown_grace,
    })
}

async fn bind(addr: &str, port: u16, name: &str) -> anyhow::Result<TcpListener> {
    let result = TcpListener::bind((addr, port))
        .await
        .with_context(|| format!("failed to bind {} listener on {}:{}", name, addr, port));
    match &result {
        Ok(listener) => {
            if let Ok(local) = listener.local_addr() {
                info!("{} listener bound on {}", name, local);
            }
        }
        Err(err) => error!("{:#}", err),
    }
    result
}

/// Accept loop for the agent listener, capped at `max_connections`
/// concurrently connected agents.
async fn accept_agents(
    listener: TcpListener,
    events: EventTx,
    max_connections: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let active = Arc::new(AtomicUsize::new(0));

    loop {
        let accepted = tokio::select! {
            _ = shutdown.wait_for(|&stopped| stopped) => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer_addr) = match accepted {
            Ok(conn) => conn,
            Err(err) => {
                error!("Agent listener accept error: {}", err);
                continue;
            }
        };

        if active.load(Ordering::Acquire) >= max_connections {
            // Transport-level admission limit: just drop the stream.
            warn!(
                "Rejecting agent connection from {}: max connections ({}) reached",
                peer_addr, max_connections
            );
            continue;
        }

        active.fetch_add(1, Ordering::AcqRel);
        let events = events.clone();
        let active = active.clone();
        tokio::spawn(async move {
            connection::run_agent(stream, events).await;
            active.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

/// Accept loop for the game-master listener; always capped at one live
/// connection. This cap is what makes the registry's replace-on-register
/// controller slot safe.
async fn accept_masters(listener: TcpListener, events: EventTx, mut shutdown: watch::Receiver<bool>) {
    let active = Arc::new(AtomicUsize::new(0));

    loop {
        let accepted = tokio::select! {
            _ = shutdown.wait_for(|&stopped| stopped) => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer_addr) = match accepted {
            Ok(conn) => conn,
            Err(err) => {
                error!("Game master listener accept error: {}", err);
                continue;
            }
        };

        if active.load(Ordering::Acquire) >= 1 {
            warn!("Rejecting second game master connection from {}", peer_addr);
            continue;
        }

        active.fetch_add(1, Ordering::AcqRel);
        let events = events.clone();
        let active = active.clone();
        tokio::spawn(async move {
            connection::run_master(stream, events).await;
            active.fetch_sub(1, Ordering::AcqRel);
        });
    }
}
