//! Wire-format definitions for protocol data units.
//!
//! Every datagram exchanged between peers is a [`Packet`]: a fixed
//! 7-byte header followed by 0..=[`crate::MAX_PAYLOAD_SIZE`] payload
//! bytes. This module owns the on-wire layout and the checksum
//! discipline; no I/O happens here.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |            Checksum           |      Kind     |  Payload ...  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_SIZE`] = 7 bytes, no padding.
//! The checksum is the RFC 1071 Internet checksum over the entire
//! serialized packet, computed last with the field zeroed.

use super::checksum;
use crate::error::{Error, Result};
use crate::MAX_PDU_SIZE;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_SIZE: usize = 7;

// Byte offsets of each field within the serialized header.
const OFF_SEQ: usize = 0;
const OFF_CHECKSUM: usize = 4;
const OFF_KIND: usize = 6;

/// Packet kind carried in the header's flag byte.
///
/// The numeric values are fixed by the protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    /// Cumulative acknowledgment; sequence names the next expected packet.
    Rr = 5,

    /// Selective reject; sequence names one missing packet to retransmit.
    Srej = 6,

    /// Handshake request carrying window size, buffer size and filename.
    Filename = 8,

    /// Handshake reply; payload is the text `Ok` or `Not Ok`.
    HandshakeAck = 9,

    /// End-of-file marker (sender to receiver), and its acknowledgment
    /// in the reverse direction.
    Eof = 10,

    /// One chunk of file content.
    Data = 16,
}

impl PacketKind {
    /// Converts a raw flag byte to a `PacketKind`.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            5 => Some(Self::Rr),
            6 => Some(Self::Srej),
            8 => Some(Self::Filename),
            9 => Some(Self::HandshakeAck),
            10 => Some(Self::Eof),
            16 => Some(Self::Data),
            _ => None,
        }
    }

    /// True for the kinds that occupy a slot in the sequenced window.
    pub const fn is_sequenced(&self) -> bool {
        matches!(self, Self::Data | Self::Eof)
    }
}

/// Fixed-size protocol header.
///
/// Fields are in host byte order; [`Packet::encode`] converts to
/// big-endian on the wire and [`Packet::decode`] converts back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Monotonically increasing packet index; exact meaning depends on
    /// the kind (window position for Data/Eof, acknowledged or rejected
    /// sequence for Rr/Srej).
    pub sequence: u32,

    /// Internet checksum over the entire serialized packet.
    ///
    /// Computed and written last by `encode`; verified by `decode`.
    pub checksum: u16,

    /// Packet kind.
    pub kind: PacketKind,
}

/// A complete protocol data unit: header plus payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Fixed 7-byte header.
    pub header: Header,

    /// Payload bytes (possibly empty).
    pub payload: Vec<u8>,
}

impl Packet {
    /// Creates a packet with a zero checksum (filled in by `encode`).
    pub fn new(kind: PacketKind, sequence: u32, payload: Vec<u8>) -> Self {
        Self {
            header: Header {
                sequence,
                checksum: 0,
                kind,
            },
            payload,
        }
    }

    /// Creates a data packet carrying one file chunk.
    pub fn data(sequence: u32, payload: Vec<u8>) -> Self {
        Self::new(PacketKind::Data, sequence, payload)
    }

    /// Creates an end-of-file packet (empty payload, own sequence).
    pub fn eof(sequence: u32) -> Self {
        Self::new(PacketKind::Eof, sequence, Vec::new())
    }

    /// Creates a cumulative acknowledgment naming the next expected
    /// sequence.
    pub fn rr(sequence: u32) -> Self {
        Self::new(PacketKind::Rr, sequence, Vec::new())
    }

    /// Creates a selective reject naming one missing sequence.
    pub fn srej(sequence: u32) -> Self {
        Self::new(PacketKind::Srej, sequence, Vec::new())
    }

    /// Creates the receiver's acknowledgment of a delivered Eof packet.
    pub fn eof_ack(sequence: u32) -> Self {
        Self::new(PacketKind::Eof, sequence, Vec::new())
    }

    /// Creates a handshake reply carrying `Ok` or `Not Ok`.
    pub fn handshake_ack(accepted: bool) -> Self {
        let payload = if accepted { b"Ok".to_vec() } else { b"Not Ok".to_vec() };
        Self::new(PacketKind::HandshakeAck, 0, payload)
    }

    /// Serializes this packet into a newly allocated byte vector.
    ///
    /// The checksum field is zeroed, the full layout is summed, and the
    /// result is written back last, so the finished datagram verifies
    /// in place. Fails with [`Error::PduTooLarge`] when header plus
    /// payload would exceed [`MAX_PDU_SIZE`]; nothing is sent for such
    /// a packet.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let total = HEADER_SIZE + self.payload.len();
        if total > MAX_PDU_SIZE {
            return Err(Error::PduTooLarge(total));
        }

        let mut buf = vec![0u8; total];
        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&self.header.sequence.to_be_bytes());
        // Checksum field stays zero while computing the checksum.
        buf[OFF_KIND] = self.header.kind as u8;
        buf[HEADER_SIZE..].copy_from_slice(&self.payload);

        let sum = checksum::compute(&buf);
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&sum.to_be_bytes());

        Ok(buf)
    }

    /// Parses a [`Packet`] from a raw datagram.
    ///
    /// Returns [`Err`] when the buffer is shorter than [`HEADER_SIZE`],
    /// the checksum does not verify, or the flag byte is not a known
    /// kind. A decode failure means the datagram must be treated as if
    /// it never arrived.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::Truncated);
        }
        if !checksum::verify(buf) {
            return Err(Error::ChecksumMismatch);
        }

        let sequence = u32::from_be_bytes(buf[OFF_SEQ..OFF_SEQ + 4].try_into().unwrap());
        let stored =
            u16::from_be_bytes(buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].try_into().unwrap());
        let kind = PacketKind::from_u8(buf[OFF_KIND]).ok_or(Error::UnknownKind(buf[OFF_KIND]))?;

        Ok(Self {
            header: Header {
                sequence,
                checksum: stored,
                kind,
            },
            payload: buf[HEADER_SIZE..].to_vec(),
        })
    }

    /// True iff the datagram's Internet checksum folds to zero.
    pub fn validate(buf: &[u8]) -> bool {
        buf.len() >= HEADER_SIZE && checksum::verify(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let pkt = Packet::data(42, b"hello".to_vec());
        let bytes = pkt.encode().unwrap();
        let decoded = Packet::decode(&bytes).unwrap();

        assert_eq!(decoded.header.sequence, 42);
        assert_eq!(decoded.header.kind, PacketKind::Data);
        assert_eq!(decoded.payload, b"hello");
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let pkt = Packet::rr(7);
        let bytes = pkt.encode().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let decoded = Packet::decode(&bytes).unwrap();
        assert_eq!(decoded.header.kind, PacketKind::Rr);
        assert_eq!(decoded.header.sequence, 7);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_big_endian_layout() {
        let bytes = Packet::data(0x0102_0304, vec![]).encode().unwrap();
        assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(bytes[6], 16);
    }

    #[test]
    fn test_validate_true_then_false_after_any_flip() {
        let bytes = Packet::data(3, b"abc".to_vec()).encode().unwrap();
        assert!(Packet::validate(&bytes));

        for byte in 0..bytes.len() {
            for bit in 0..8 {
                let mut corrupt = bytes.clone();
                corrupt[byte] ^= 1 << bit;
                assert!(!Packet::validate(&corrupt));
            }
        }
    }

    #[test]
    fn test_decode_corrupt_rejected() {
        let mut bytes = Packet::data(0, b"data".to_vec()).encode().unwrap();
        bytes[HEADER_SIZE] ^= 0xff;
        assert!(matches!(Packet::decode(&bytes), Err(Error::ChecksumMismatch)));
    }

    #[test]
    fn test_decode_short_buffer_rejected() {
        assert!(matches!(Packet::decode(&[0u8; HEADER_SIZE - 1]), Err(Error::Truncated)));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut bytes = Packet::data(0, vec![]).encode().unwrap();
        bytes[OFF_KIND] = 99;
        // Fix the checksum so only the kind byte is at fault.
        bytes[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&[0, 0]);
        let sum = crate::core::checksum::compute(&bytes);
        bytes[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&sum.to_be_bytes());

        assert!(matches!(Packet::decode(&bytes), Err(Error::UnknownKind(99))));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let pkt = Packet::data(0, vec![0u8; MAX_PDU_SIZE]);
        assert!(matches!(pkt.encode(), Err(Error::PduTooLarge(_))));
    }

    #[test]
    fn test_handshake_ack_payloads() {
        let ok = Packet::handshake_ack(true);
        let reject = Packet::handshake_ack(false);
        assert_eq!(ok.payload, b"Ok");
        assert_eq!(reject.payload, b"Not Ok");
        assert_eq!(ok.header.kind, PacketKind::HandshakeAck);
    }
}
