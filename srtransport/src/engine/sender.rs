//! Send-side selective-repeat state machine.
//!
//! [`SenderEngine`] owns the send window and decides what goes on the
//! wire; all socket and file I/O is the caller's responsibility. The
//! driving loop queues file chunks while [`can_queue`] holds, transmits
//! every packet the engine hands back, and feeds acknowledgments,
//! rejects and timeouts into the matching `on_*` method.
//!
//! # Protocol contract
//!
//! - At most `window_size` packets are outstanding at once; the window
//!   fills completely before any acknowledgment is required.
//! - A cumulative RR carrying `s > base` slides the window to `s` and
//!   opens room for new packets; `s <= base` is stale and slides
//!   nothing.
//! - An SREJ replays exactly the named packet from the window store,
//!   re-deriving its Eof kind when it is the end-of-file sequence.
//! - A timeout retransmits every outstanding packet in
//!   `[base, next_seq)`: a timeout signals a heavier loss event than a
//!   single gap, so bulk recovery is used beneath the otherwise
//!   selective scheme.
//! - Ten consecutive timeouts abandon the session; any validated
//!   incoming packet resets the count.
//!
//! [`can_queue`]: SenderEngine::can_queue

use log::{debug, warn};

use crate::buffer::SendWindow;
use crate::config::SessionConfig;
use crate::core::Packet;
use crate::error::{Error, Result};
use crate::MAX_ATTEMPTS;

/// Phases of the send-side state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderPhase {
    /// Initial burst: filling the window before the first ack.
    Filling,

    /// Steady-state send/ack loop.
    Steady,

    /// End-of-file queued; waiting for its acknowledgment.
    EofPending,

    /// Eof acknowledged; transfer complete.
    Done,

    /// Consecutive-timeout bound exceeded; session abandoned.
    Aborted,
}

/// Send-side engine state for one transfer session.
#[derive(Debug)]
pub struct SenderEngine {
    window: SendWindow,
    phase: SenderPhase,

    /// Sequence of the Eof packet, set once the file is exhausted.
    eof_seq: Option<u32>,

    /// Consecutive receive timeouts since the last valid packet.
    timeouts: u32,
}

impl SenderEngine {
    /// Creates an engine for a freshly negotiated session.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            window: SendWindow::new(config.window_size),
            phase: SenderPhase::Filling,
            eof_seq: None,
            timeouts: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SenderPhase {
        self.phase
    }

    /// Lowest unacknowledged sequence.
    pub fn base(&self) -> u32 {
        self.window.base()
    }

    /// Number of packets awaiting acknowledgment.
    pub fn in_flight(&self) -> u32 {
        self.window.in_flight()
    }

    /// True while another chunk (or the Eof marker) may be queued:
    /// the window has room and end-of-file has not been reached.
    pub fn can_queue(&self) -> bool {
        matches!(self.phase, SenderPhase::Filling | SenderPhase::Steady)
            && !self.window.is_full()
            && self.eof_seq.is_none()
    }

    /// Queues one file chunk, returning the data packet to transmit.
    pub fn queue_chunk(&mut self, chunk: &[u8]) -> Result<Packet> {
        let seq = self.window.insert(chunk)?;
        debug!("queued DATA seq={} len={} in_flight={}", seq, chunk.len(), self.in_flight());
        Ok(Packet::data(seq, chunk.to_vec()))
    }

    /// Queues the end-of-file marker, returning the Eof packet to
    /// transmit. The marker occupies its own sequence number and is
    /// acknowledged like any other packet.
    pub fn queue_eof(&mut self) -> Result<Packet> {
        let seq = self.window.insert(&[])?;
        self.eof_seq = Some(seq);
        self.phase = SenderPhase::EofPending;
        debug!("queued EOF seq={seq}");
        Ok(Packet::eof(seq))
    }

    /// Processes a cumulative acknowledgment naming the next sequence
    /// the receiver expects.
    ///
    /// Returns the number of packets newly acknowledged; `0` for a
    /// stale or spurious ack. Either way the packet proves the peer is
    /// alive, so the timeout count resets.
    pub fn on_rr(&mut self, ack: u32) -> u32 {
        self.note_liveness();

        if ack > self.window.next_seq() {
            warn!("ignoring RR {} beyond next_seq {}", ack, self.window.next_seq());
            return 0;
        }

        let slid = self.window.advance(ack);
        if slid > 0 {
            debug!("RR {} slid window by {} (base={})", ack, slid, self.base());
        }
        slid
    }

    /// Processes a selective reject, returning the one packet to
    /// retransmit.
    ///
    /// `None` when the named sequence is no longer (or not yet) held in
    /// the window — nothing sensible can be replayed. Window bounds are
    /// untouched either way.
    pub fn on_srej(&mut self, seq: u32) -> Option<Packet> {
        self.note_liveness();

        let pkt = self.rebuild(seq);
        match &pkt {
            Some(_) => debug!("SREJ {seq}: retransmitting"),
            None => warn!("SREJ {seq} names no pending packet"),
        }
        pkt
    }

    /// Processes the receiver's acknowledgment of the Eof packet.
    pub fn on_eof_ack(&mut self) {
        self.note_liveness();
        self.phase = SenderPhase::Done;
        debug!("EOF acknowledged, transfer complete");
    }

    /// Processes a receive timeout with no packet at all.
    ///
    /// Returns every outstanding packet in `[base, next_seq)` for bulk
    /// retransmission, or [`Error::RetriesExhausted`] once the
    /// consecutive-timeout bound is reached, after which the engine is
    /// [`SenderPhase::Aborted`].
    pub fn on_timeout(&mut self) -> Result<Vec<Packet>> {
        self.timeouts += 1;
        if self.timeouts >= MAX_ATTEMPTS {
            self.phase = SenderPhase::Aborted;
            return Err(Error::RetriesExhausted);
        }

        let burst: Vec<Packet> = (self.window.base()..self.window.next_seq())
            .filter_map(|seq| self.rebuild(seq))
            .collect();
        debug!(
            "timeout {}/{}: retransmitting {} outstanding packet(s)",
            self.timeouts,
            MAX_ATTEMPTS,
            burst.len()
        );
        Ok(burst)
    }

    /// True once the Eof packet has been acknowledged.
    pub fn is_done(&self) -> bool {
        self.phase == SenderPhase::Done
    }

    /// Rebuilds the wire packet for a buffered sequence, restoring its
    /// Eof kind when `seq` is the end-of-file sequence.
    fn rebuild(&self, seq: u32) -> Option<Packet> {
        let payload = self.window.retrieve(seq)?;
        if self.eof_seq == Some(seq) {
            Some(Packet::eof(seq))
        } else {
            Some(Packet::data(seq, payload.to_vec()))
        }
    }

    /// A validated packet arrived: reset the timeout count and leave
    /// the initial-burst phase.
    fn note_liveness(&mut self) {
        self.timeouts = 0;
        if self.phase == SenderPhase::Filling {
            self.phase = SenderPhase::Steady;
        }
    }
}
