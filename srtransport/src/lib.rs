//! # SRTransport - Selective-Repeat ARQ File Transfer
//!
//! SRTransport implements a reliable file-transfer protocol over an
//! unreliable, lossy, corruption-prone datagram transport (UDP). It
//! provides:
//!
//! - **Checksummed PDUs**: RFC 1071 Internet checksum over every datagram
//! - **Sliding windows**: up to `window_size` packets pipelined in flight
//! - **Selective retransmission**: one SREJ replays exactly one packet
//! - **Timeout recovery**: bulk retransmission of the outstanding window
//! - **Out-of-order reassembly**: arrivals buffered until contiguous
//! - **Session isolation**: one endpoint, window and engine per transfer
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Session Layer                          │
//! │  ┌──────────────────┐        ┌───────────────────────┐  │
//! │  │  SenderSession   │        │   ReceiverSession     │  │
//! │  │ (file → packets) │        │ (packets → file + ack)│  │
//! │  └──────────────────┘        └───────────────────────┘  │
//! ├─────────────────────────────────────────────────────────┤
//! │                   Engine Layer                           │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────────────┐   │
//! │  │ SenderEngine │ │ReceiverEngine│ │ Sliding Window │   │
//! │  └──────────────┘ └──────────────┘ └────────────────┘   │
//! ├─────────────────────────────────────────────────────────┤
//! │                   Packet Layer                           │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────────────┐   │
//! │  │    Codec     │ │   Checksum   │ │   Handshake    │   │
//! │  └──────────────┘ └──────────────┘ └────────────────┘   │
//! ├─────────────────────────────────────────────────────────┤
//! │                   Transport Layer                        │
//! │  ┌─────────────────────────────────────────────────┐    │
//! │  │      Endpoint (UDP + impairment fault model)    │    │
//! │  └─────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use srtransport::{Endpoint, Impairment, SessionConfig, TransferRequest};
//! use srtransport::session::ReceiverSession;
//!
//! let config = SessionConfig::new(4, 1000)?;
//! let request = TransferRequest::new("data.bin", config)?;
//! let endpoint = Endpoint::ephemeral(Impairment::off()).await?;
//!
//! let session = ReceiverSession::establish(endpoint, server_addr, &request).await?;
//! session.run(tokio::fs::File::create("copy.bin").await?).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod handshake;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use crate::core::{Header, Packet, PacketKind, HEADER_SIZE};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use handshake::TransferRequest;
pub use transport::{Endpoint, Impairment};

use std::time::Duration;

/// Transport-imposed ceiling on one datagram (header plus payload).
pub const MAX_PDU_SIZE: usize = 1407;

/// Maximum payload bytes per data packet.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PDU_SIZE - HEADER_SIZE;

/// Largest negotiable window size.
pub const MAX_WINDOW_SIZE: u32 = 1 << 30;

/// Fixed wait for the next datagram, on both sides, for handshake
/// retries and steady-state ack waits alike.
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(1);

/// Consecutive timeouts (or handshake attempts) after which a session
/// is abandoned.
pub const MAX_ATTEMPTS: u32 = 10;

/// Default window size when none is requested.
pub const DEFAULT_WINDOW_SIZE: u32 = 8;

/// Default payload bytes per data packet when none is requested.
pub const DEFAULT_BUFFER_SIZE: u32 = 1000;
