//! Receive-side selective-repeat state machine.
//!
//! [`ReceiverEngine`] owns the receive window and the `expected`
//! frontier — the lowest sequence not yet delivered to the output
//! sink. The driving loop feeds it every decoded packet (and every
//! corrupt datagram and timeout) and acts on the returned
//! [`Delivery`]: append `bytes` to the sink, transmit `reply`, stop
//! when `complete`.
//!
//! Dispatch for an arriving Data/Eof packet with sequence `seq`:
//!
//! - `seq == expected`: deliver the payload, drain every buffered
//!   packet that is now contiguous, answer with a cumulative RR for
//!   the new frontier (or the EOF ack once the Eof sequence has been
//!   delivered).
//! - `expected < seq < expected + window_size`: buffer it and answer
//!   SREJ naming `expected`, the first missing sequence.
//! - `seq < expected`: duplicate of delivered data; re-answer the
//!   current RR and leave the window untouched.
//! - `seq >= expected + window_size`: not processable now; answer
//!   SREJ for `expected` as a conservative recovery signal.
//!
//! Bytes reach the sink in order, exactly once, no matter how the
//! network reorders or duplicates datagrams.

use log::{debug, warn};

use crate::buffer::ReceiveWindow;
use crate::config::SessionConfig;
use crate::core::{Packet, PacketKind};
use crate::error::{Error, Result};
use crate::MAX_ATTEMPTS;

/// Phases of the receive-side state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverPhase {
    /// Accepting data packets.
    Receiving,

    /// The Eof packet has been seen but a gap before it remains.
    EofSeen,

    /// Everything up to and including Eof delivered and acknowledged.
    Done,

    /// Consecutive-timeout bound exceeded; session abandoned.
    Aborted,
}

/// Outcome of processing one incoming packet.
#[derive(Debug)]
pub struct Delivery {
    /// In-order payload bytes to append to the output sink.
    pub bytes: Vec<u8>,

    /// Packet to transmit back to the sender, if any.
    pub reply: Option<Packet>,

    /// True once the transfer is complete and acknowledged.
    pub complete: bool,
}

impl Delivery {
    fn ignored() -> Self {
        Self {
            bytes: Vec::new(),
            reply: None,
            complete: false,
        }
    }

    fn reply(packet: Packet) -> Self {
        Self {
            bytes: Vec::new(),
            reply: Some(packet),
            complete: false,
        }
    }
}

/// Receive-side engine state for one transfer session.
#[derive(Debug)]
pub struct ReceiverEngine {
    window: ReceiveWindow,

    /// Lowest sequence not yet delivered (the cumulative-ack frontier).
    expected: u32,

    /// Sequence of the Eof packet, once seen.
    eof_seq: Option<u32>,

    phase: ReceiverPhase,

    /// Consecutive receive timeouts since the last valid packet.
    timeouts: u32,
}

impl ReceiverEngine {
    /// Creates an engine for a freshly negotiated session.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            window: ReceiveWindow::new(config.window_size),
            expected: 0,
            eof_seq: None,
            phase: ReceiverPhase::Receiving,
            timeouts: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ReceiverPhase {
        self.phase
    }

    /// Lowest sequence not yet delivered to the sink.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// True once the Eof sequence has been delivered and acknowledged.
    pub fn is_complete(&self) -> bool {
        self.phase == ReceiverPhase::Done
    }

    /// Processes one validated incoming packet.
    ///
    /// Fails only on a window-slot collision, which is a fatal protocol
    /// error; the engine is then [`ReceiverPhase::Aborted`].
    pub fn on_packet(&mut self, packet: &Packet) -> Result<Delivery> {
        self.timeouts = 0;

        if !packet.header.kind.is_sequenced() {
            warn!("ignoring unexpected {:?} packet", packet.header.kind);
            return Ok(Delivery::ignored());
        }

        let seq = packet.header.sequence;
        if seq == self.expected {
            self.deliver_in_order(packet)
        } else if seq < self.expected {
            debug!("duplicate seq={} (expected {}), re-sending RR", seq, self.expected);
            Ok(Delivery::reply(Packet::rr(self.expected)))
        } else if self.window.contains(self.expected, seq) {
            self.buffer_out_of_order(packet)
        } else {
            warn!(
                "seq={} outside admissible window [{}, {}), sending SREJ",
                seq,
                self.expected,
                self.expected + self.window.window_size()
            );
            Ok(Delivery::reply(Packet::srej(self.expected)))
        }
    }

    /// Processes a datagram whose checksum failed: ask for the first
    /// missing sequence and take no other action. Corruption does not
    /// count as a valid packet, so the timeout count stands.
    pub fn on_corrupt(&mut self) -> Packet {
        debug!("corrupt datagram, requesting seq={}", self.expected);
        Packet::srej(self.expected)
    }

    /// Processes a receive timeout with no packet at all.
    ///
    /// Returns [`Error::RetriesExhausted`] once the consecutive-timeout
    /// bound is reached, after which the engine is
    /// [`ReceiverPhase::Aborted`]; whatever was delivered so far stays
    /// in the sink.
    pub fn on_timeout(&mut self) -> Result<()> {
        self.timeouts += 1;
        if self.timeouts >= MAX_ATTEMPTS {
            self.phase = ReceiverPhase::Aborted;
            return Err(Error::RetriesExhausted);
        }
        Ok(())
    }

    fn deliver_in_order(&mut self, packet: &Packet) -> Result<Delivery> {
        let mut bytes = packet.payload.clone();
        if packet.header.kind == PacketKind::Eof {
            self.eof_seq = Some(packet.header.sequence);
        }

        self.expected += 1;
        self.expected = self.window.drain_contiguous(self.expected, &mut bytes);

        if let Some(eof) = self.eof_seq {
            if self.expected > eof {
                debug!("EOF delivered at seq={eof}, acknowledging");
                self.phase = ReceiverPhase::Done;
                return Ok(Delivery {
                    bytes,
                    reply: Some(Packet::eof_ack(self.expected)),
                    complete: true,
                });
            }
            self.phase = ReceiverPhase::EofSeen;
        }

        debug!("delivered through seq={}, sending RR", self.expected - 1);
        Ok(Delivery {
            bytes,
            reply: Some(Packet::rr(self.expected)),
            complete: false,
        })
    }

    fn buffer_out_of_order(&mut self, packet: &Packet) -> Result<Delivery> {
        if packet.header.kind == PacketKind::Eof {
            self.eof_seq = Some(packet.header.sequence);
            self.phase = ReceiverPhase::EofSeen;
        }

        match self.window.buffer(packet.header.sequence, &packet.payload) {
            Ok(fresh) => {
                debug!(
                    "buffered seq={} ({}), missing seq={}",
                    packet.header.sequence,
                    if fresh { "new" } else { "duplicate" },
                    self.expected
                );
                Ok(Delivery::reply(Packet::srej(self.expected)))
            }
            Err(e) => {
                self.phase = ReceiverPhase::Aborted;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(window: u32) -> ReceiverEngine {
        ReceiverEngine::new(&SessionConfig::new(window, 100).unwrap())
    }

    fn reply_of(d: &Delivery) -> (PacketKind, u32) {
        let p = d.reply.as_ref().expect("reply expected");
        (p.header.kind, p.header.sequence)
    }

    #[test]
    fn test_in_order_stream() {
        let mut e = engine(4);
        let mut sink = Vec::new();

        for (i, chunk) in [b"aa", b"bb", b"cc"].iter().enumerate() {
            let d = e.on_packet(&Packet::data(i as u32, chunk.to_vec())).unwrap();
            sink.extend_from_slice(&d.bytes);
            assert_eq!(reply_of(&d), (PacketKind::Rr, i as u32 + 1));
        }

        let d = e.on_packet(&Packet::eof(3)).unwrap();
        assert!(d.complete);
        assert_eq!(reply_of(&d), (PacketKind::Eof, 4));
        assert_eq!(sink, b"aabbcc");
        assert!(e.is_complete());
    }

    #[test]
    fn test_gap_buffers_and_srejs_first_missing() {
        let mut e = engine(4);
        e.on_packet(&Packet::data(0, b"aa".to_vec())).unwrap();

        let d = e.on_packet(&Packet::data(2, b"cc".to_vec())).unwrap();
        assert!(d.bytes.is_empty());
        assert_eq!(reply_of(&d), (PacketKind::Srej, 1));

        let d = e.on_packet(&Packet::data(3, b"dd".to_vec())).unwrap();
        assert_eq!(reply_of(&d), (PacketKind::Srej, 1));

        // The gap closes: 1, then buffered 2 and 3, drain together.
        let d = e.on_packet(&Packet::data(1, b"bb".to_vec())).unwrap();
        assert_eq!(d.bytes, b"bbccdd");
        assert_eq!(reply_of(&d), (PacketKind::Rr, 4));
    }

    #[test]
    fn test_duplicate_delivered_reacked_without_bytes() {
        let mut e = engine(4);
        e.on_packet(&Packet::data(0, b"aa".to_vec())).unwrap();

        let d = e.on_packet(&Packet::data(0, b"aa".to_vec())).unwrap();
        assert!(d.bytes.is_empty());
        assert_eq!(reply_of(&d), (PacketKind::Rr, 1));
        assert_eq!(e.expected(), 1);
    }

    #[test]
    fn test_duplicate_buffered_is_harmless() {
        let mut e = engine(4);
        let d1 = e.on_packet(&Packet::data(2, b"cc".to_vec())).unwrap();
        let d2 = e.on_packet(&Packet::data(2, b"cc".to_vec())).unwrap();
        assert_eq!(reply_of(&d1), (PacketKind::Srej, 0));
        assert_eq!(reply_of(&d2), (PacketKind::Srej, 0));
    }

    #[test]
    fn test_beyond_window_srejs_expected() {
        let mut e = engine(4);
        let d = e.on_packet(&Packet::data(4, b"ee".to_vec())).unwrap();
        assert!(d.bytes.is_empty());
        assert_eq!(reply_of(&d), (PacketKind::Srej, 0));
        assert_eq!(e.expected(), 0);
    }

    #[test]
    fn test_eof_out_of_order_completes_after_drain() {
        let mut e = engine(4);
        e.on_packet(&Packet::data(0, b"aa".to_vec())).unwrap();

        let d = e.on_packet(&Packet::eof(2)).unwrap();
        assert_eq!(reply_of(&d), (PacketKind::Srej, 1));
        assert_eq!(e.phase(), ReceiverPhase::EofSeen);

        let d = e.on_packet(&Packet::data(1, b"bb".to_vec())).unwrap();
        assert!(d.complete);
        assert_eq!(d.bytes, b"bb");
        assert_eq!(reply_of(&d), (PacketKind::Eof, 3));
    }

    #[test]
    fn test_corrupt_requests_expected() {
        let mut e = engine(4);
        e.on_packet(&Packet::data(0, b"aa".to_vec())).unwrap();

        let srej = e.on_corrupt();
        assert_eq!(srej.header.kind, PacketKind::Srej);
        assert_eq!(srej.header.sequence, 1);
    }

    #[test]
    fn test_consecutive_timeouts_abort() {
        let mut e = engine(4);
        for _ in 0..MAX_ATTEMPTS - 1 {
            e.on_timeout().unwrap();
        }
        assert!(matches!(e.on_timeout(), Err(Error::RetriesExhausted)));
        assert_eq!(e.phase(), ReceiverPhase::Aborted);
    }

    #[test]
    fn test_valid_packet_resets_timeout_count() {
        let mut e = engine(4);
        for _ in 0..MAX_ATTEMPTS - 1 {
            e.on_timeout().unwrap();
        }
        e.on_packet(&Packet::data(0, b"aa".to_vec())).unwrap();
        for _ in 0..MAX_ATTEMPTS - 1 {
            e.on_timeout().unwrap();
        }
    }

    #[test]
    fn test_idempotent_delivery_under_permutation_and_duplication() {
        // Five data chunks plus Eof, shuffled with duplicates mixed in.
        let chunks: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 3]).collect();
        let arrival_order = [3u32, 0, 0, 2, 4, 1, 3, 5, 2, 5];

        let mut e = engine(8);
        let mut sink = Vec::new();
        let mut last_expected = 0;

        for &seq in &arrival_order {
            let pkt = if seq == 5 {
                Packet::eof(5)
            } else {
                Packet::data(seq, chunks[seq as usize].clone())
            };
            let d = e.on_packet(&pkt).unwrap();
            sink.extend_from_slice(&d.bytes);

            // The frontier never moves backwards.
            assert!(e.expected() >= last_expected);
            last_expected = e.expected();
        }

        let whole: Vec<u8> = chunks.concat();
        assert_eq!(sink, whole);
        assert!(e.is_complete());
    }
}
