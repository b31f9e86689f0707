//! Length-prefixed frame codec.
//!
//! Framing model:
//!
//! ```text
//! [0..2] : payload length (u16 LE)
//! [2..]  : payload bytes (exactly that many)
//! ```
//!
//! There is no length field for the header itself and no frame-level
//! checksum; the payload may contain arbitrary bytes, including control
//! bytes. Length-prefixing keeps framing O(1) per byte with no escaping,
//! at the cost of a hard 65535-byte ceiling per message.
//!
//! [`FrameDecoder`] turns an arbitrarily-chunked byte stream into a
//! sequence of complete payloads. It owns a queue of buffered chunks and
//! alternates between two states:
//!
//! ```text
//! AwaitingHeader ⇄ AwaitingPayload { len }
//! ```
//!
//! Each [`FrameDecoder::feed`] call appends one chunk and then drains as
//! many complete frames as are buffered, in order. The decoder never
//! blocks and never drops a complete frame; an incomplete frame simply
//! waits for more input. [`encode`] produces the matching framed bytes
//! for one outgoing payload.

use std::collections::VecDeque;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// Size of the length header in bytes.
pub const HEADER_LEN: usize = 2;

/// Largest payload a single frame can carry (the header is a `u16`).
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Errors that can arise when encoding a frame.
#[derive(Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// Payload exceeds [`MAX_PAYLOAD_LEN`]; the codec does not split
    /// oversized payloads.
    PayloadTooLarge(usize),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::PayloadTooLarge(len) => {
                write!(f, "Payload of {} bytes exceeds frame limit of {}", len, MAX_PAYLOAD_LEN)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Encode one payload into a framed byte buffer.
///
/// Produces `[u16 LE length][payload]` in a single contiguous buffer so
/// the caller can hand it to the transport as one write.
pub fn encode(payload: &[u8]) -> Result<Bytes, EncodeError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::PayloadTooLarge(payload.len()));
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u16_le(payload.len() as u16);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    AwaitingHeader,
    AwaitingPayload { len: usize },
}

/// Streaming deframer for one connection.
///
/// Exclusively owned by the connection it serves; created on accept and
/// dropped with it. Closing a connection discards any partially buffered
/// frame with the decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    chunks: VecDeque<Bytes>,
    buffered: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder {
            state: DecodeState::AwaitingHeader,
            chunks: VecDeque::new(),
            buffered: 0,
        }
    }

    /// Append one chunk of received bytes and drain every frame that is
    /// now complete, in order.
    ///
    /// Returns zero payloads when the buffered bytes do not yet complete
    /// a frame, and more than one when a single chunk carries several
    /// back-to-back frames. Chunk boundaries are irrelevant: the emitted
    /// payload sequence depends only on the byte stream.
    pub fn feed(&mut self, chunk: Bytes) -> Vec<Bytes> {
        if !chunk.is_empty() {
            self.buffered += chunk.len();
            self.chunks.push_back(chunk);
        }

        let mut frames = Vec::new();
        loop {
            match self.state {
                DecodeState::AwaitingHeader => {
                    if self.buffered < HEADER_LEN {
                        break;
                    }
                    let header = self.take(HEADER_LEN);
                    let len = u16::from_le_bytes([header[0], header[1]]) as usize;
                    self.state = DecodeState::AwaitingPayload { len };
                }
                DecodeState::AwaitingPayload { len } => {
                    if self.buffered < len {
                        break;
                    }
                    frames.push(self.take(len));
                    self.state = DecodeState::AwaitingHeader;
                }
            }
        }
        frames
    }

    /// Number of bytes buffered but not yet emitted as a payload.
    pub fn buffered_len(&self) -> usize {
        self.buffered
    }

    /// Remove exactly `n` bytes from the front of the chunk queue.
    ///
    /// Caller must have checked `self.buffered >= n`. Excess bytes in a
    /// chunk stay queued for the next read; a read spanning several
    /// chunks is assembled into one contiguous buffer.
    fn take(&mut self, n: usize) -> Bytes {
        self.buffered -= n;

        if n == 0 {
            return Bytes::new();
        }

        // Fast path: the front chunk alone satisfies the read.
        {
            let front = self
                .chunks
                .front_mut()
                .expect("byte accounting out of sync with chunk queue");
            if front.len() == n {
                return self.chunks.pop_front().unwrap();
            }
            if front.len() > n {
                return front.split_to(n);
            }
        }

        // Slow path: assemble from multiple consecutive chunks.
        let mut out = BytesMut::with_capacity(n);
        let mut remaining = n;
        while remaining > 0 {
            let mut front = self.chunks.pop_front().unwrap();
            if front.len() <= remaining {
                remaining -= front.len();
                out.put(front);
            } else {
                out.put(front.split_to(remaining));
                remaining = 0;
                self.chunks.push_front(front);
            }
        }
        out.freeze()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
