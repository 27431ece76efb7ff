//! Handshake request codec and acknowledgment payloads.
//!
//! A session starts with a Filename packet whose payload carries the
//! parameters the whole transfer will use:
//!
//! ```text
//! +--------------+--------------+--------------+------------------+
//! | window: u32  | buffer: u32  | name_len: u8 | filename (bytes) |
//! +--------------+--------------+--------------+------------------+
//! ```
//!
//! The server answers with a HandshakeAck whose payload is the literal
//! text `Ok` (proceed) or `Not Ok` (abort). A payload too short for its
//! declared lengths is a protocol violation: the request is rejected
//! locally and no session is established.

use crate::config::SessionConfig;
use crate::core::{Packet, PacketKind};
use crate::error::{Error, Result};

/// Longest accepted filename, in bytes.
pub const MAX_FILENAME: usize = 100;

/// Positive handshake acknowledgment payload.
pub const ACK_OK: &[u8] = b"Ok";

/// Negative handshake acknowledgment payload.
pub const ACK_REJECT: &[u8] = b"Not Ok";

/// Fixed-size prefix before the filename bytes.
const FIXED_LEN: usize = 9;

/// A parsed transfer request: the session parameters plus the name of
/// the file to fetch from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Window and buffer sizes the session will use.
    pub config: SessionConfig,

    /// Name of the file to fetch, relative to the server.
    pub filename: String,
}

impl TransferRequest {
    /// Creates a request, enforcing the filename length limit.
    pub fn new(filename: impl Into<String>, config: SessionConfig) -> Result<Self> {
        let filename = filename.into();
        if filename.is_empty() || filename.len() > MAX_FILENAME {
            return Err(Error::FilenameTooLong(filename.len()));
        }
        Ok(Self { config, filename })
    }

    /// Serializes the request payload.
    pub fn encode(&self) -> Vec<u8> {
        let name = self.filename.as_bytes();
        let mut payload = Vec::with_capacity(FIXED_LEN + name.len());
        payload.extend_from_slice(&self.config.window_size.to_be_bytes());
        payload.extend_from_slice(&self.config.buffer_size.to_be_bytes());
        payload.push(name.len() as u8);
        payload.extend_from_slice(name);
        payload
    }

    /// Parses a request payload.
    ///
    /// Rejects payloads shorter than their declared lengths, filenames
    /// that are not UTF-8, and parameters outside the negotiable
    /// ranges.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < FIXED_LEN {
            return Err(Error::MalformedHandshake);
        }

        let window_size = u32::from_be_bytes(payload[0..4].try_into().unwrap());
        let buffer_size = u32::from_be_bytes(payload[4..8].try_into().unwrap());
        let name_len = payload[8] as usize;

        if name_len == 0 || payload.len() < FIXED_LEN + name_len {
            return Err(Error::MalformedHandshake);
        }

        let filename = std::str::from_utf8(&payload[FIXED_LEN..FIXED_LEN + name_len])
            .map_err(|_| Error::MalformedHandshake)?
            .to_owned();
        let config = SessionConfig::new(window_size, buffer_size)?;

        Self::new(filename, config)
    }

    /// Wraps the request into its Filename packet (sequence 0).
    pub fn to_packet(&self) -> Packet {
        Packet::new(PacketKind::Filename, 0, self.encode())
    }
}

/// True when a HandshakeAck payload means the server accepted.
pub fn is_accepted(ack_payload: &[u8]) -> bool {
    ack_payload == ACK_OK
}
