//! Core data structures for the transfer protocol.
//!
//! This module contains the fundamental building blocks:
//! - Packet: wire-level protocol data unit with header and payload
//! - Checksum: RFC 1071 Internet checksum for integrity verification

pub mod checksum;
mod packet;

pub use packet::{Header, Packet, PacketKind, HEADER_SIZE};
