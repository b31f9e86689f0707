//! Per-connection I/O task.
//!
//! Each accepted socket gets one task that owns the socket and its
//! frame decoder exclusively. The task:
//! - feeds received bytes through the decoder and forwards every
//!   complete payload to the dispatcher as an event,
//! - frames and writes payloads arriving on its outbound channel,
//! - exits when the peer closes, the socket errors, or the dispatcher
//!   drops the outbound sender (proactive teardown).
//!
//! Framing state lives and dies with the task; a partially buffered
//! frame is discarded when the connection closes.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use relay_protocol::{encode, FrameDecoder};

use crate::types::{Event, EventTx, OutboundRx};

const READ_BUF_SIZE: usize = 4096;

/// Run the I/O loop for a freshly accepted agent connection.
pub async fn run_agent(stream: TcpStream, events: EventTx) {
    let peer = peer_name(&stream);

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (id_tx, id_rx) = oneshot::channel();
    if events
        .send(Event::AgentConnected {
            peer: peer.clone(),
            outbound: out_tx,
            id_tx,
        })
        .is_err()
    {
        return; // relay is shutting down
    }
    let id = match id_rx.await {
        Ok(id) => id,
        Err(_) => return,
    };

    if let Err(err) = io_loop(stream, out_rx, |payload| {
        events.send(Event::AgentFrame { id, payload }).is_ok()
    })
    .await
    {
        warn!("[{}, AID: {}] socket error: {}", peer, id, err);
    }

    debug!("[{}, AID: {}] connection task finished", peer, id);
    let _ = events.send(Event::AgentClosed { id });
}

/// Run the I/O loop for a freshly accepted game-master connection.
pub async fn run_master(stream: TcpStream, events: EventTx) {
    let peer = peer_name(&stream);

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    if events
        .send(Event::MasterConnected {
            peer: peer.clone(),
            outbound: out_tx,
        })
        .is_err()
    {
        return;
    }

    if let Err(err) = io_loop(stream, out_rx, |payload| {
        events.send(Event::MasterFrame { payload }).is_ok()
    })
    .await
    {
        warn!("[GM | {}] socket error: {}", peer, err);
    }

    debug!("[GM | {}] connection task finished", peer);
    let _ = events.send(Event::MasterClosed);
}

fn peer_name(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown peer".to_string())
}

/// Shared read/write loop.
///
/// `on_frame` forwards one complete payload to the dispatcher and
/// returns false once the dispatcher is gone.
async fn io_loop<F>(stream: TcpStream, mut out_rx: OutboundRx, mut on_frame: F) -> std::io::Result<()>
where
    F: FnMut(Bytes) -> bool,
{
    let (mut read_half, mut write_half) = stream.into_split();
    let mut decoder = FrameDecoder::new();
    let mut buf = BytesMut::with_capacity(READ_BUF_SIZE);

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(payload) => match encode(&payload) {
                    // One contiguous buffer per frame, one write. A
                    // failed write is logged but does not end the
                    // connection or disturb decoder state; a dead
                    // socket surfaces through the read side.
                    Ok(framed) => {
                        if let Err(err) = write_half.write_all(&framed).await {
                            warn!("Write failed: {}", err);
                        }
                    }
                    // Oversized payload: drop this message, keep the
                    // connection and codec state intact.
                    Err(err) => warn!("dropping outbound message: {}", err),
                },
                // Dispatcher dropped the sender: proactive teardown.
                None => return Ok(()),
            },
            read = read_half.read_buf(&mut buf) => {
                if read? == 0 {
                    return Ok(()); // peer closed
                }
                for payload in decoder.feed(buf.split().freeze()) {
                    if !on_frame(payload) {
                        return Ok(());
                    }
                }
            }
        }
    }
}
