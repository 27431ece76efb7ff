//! Fixed-capacity sliding window stores for both transfer directions.
//!
//! Both sides of a transfer keep packets in a circular slot arena
//! indexed by `sequence % window_size`: the sender buffers payloads
//! until they are cumulatively acknowledged (for selective and timeout
//! retransmission), the receiver buffers out-of-order arrivals until
//! the gap in front of them closes. Slots are allocated once per
//! session and reused for its whole life; a store is owned exclusively
//! by the engine of one session and never shared.
//!
//! A slot that still holds a different unacknowledged sequence is never
//! silently overwritten: that collision is a window overflow, reported
//! as a fatal [`Error::WindowCollision`].

use crate::error::{Error, Result};

/// One window position: a sequence number, its payload, and a validity
/// flag marking whether the slot currently holds a pending packet.
#[derive(Debug, Clone)]
struct Slot {
    sequence: u32,
    payload: Vec<u8>,
    valid: bool,
}

impl Slot {
    fn empty() -> Self {
        Self {
            sequence: 0,
            payload: Vec::new(),
            valid: false,
        }
    }

    fn fill(&mut self, sequence: u32, payload: &[u8]) {
        self.sequence = sequence;
        self.payload.clear();
        self.payload.extend_from_slice(payload);
        self.valid = true;
    }
}

fn slot_index(sequence: u32, window_size: u32) -> usize {
    (sequence % window_size) as usize
}

// ---------------------------------------------------------------------------
// SendWindow
// ---------------------------------------------------------------------------

/// Send-side window: payloads buffered for retransmission.
///
/// # Sequence-number layout
///
/// ```text
///      base             next_seq
///       │                  │
///   ────┼──────────────────┼──────────────────▶ seq space
///       │ ◀─ outstanding ─▶│ ◀── sendable ───▶
/// ```
///
/// Invariant: `next_seq - base <= window_size` at all times; `base`
/// only moves forward, on a strictly advancing cumulative ack.
#[derive(Debug)]
pub struct SendWindow {
    slots: Vec<Slot>,
    window_size: u32,

    /// Lowest unacknowledged sequence (left window edge).
    base: u32,

    /// Next sequence number to allocate.
    next_seq: u32,
}

impl SendWindow {
    /// Creates a send window with `window_size` slots.
    pub fn new(window_size: u32) -> Self {
        Self {
            slots: vec![Slot::empty(); window_size as usize],
            window_size,
            base: 0,
            next_seq: 0,
        }
    }

    /// Lowest unacknowledged sequence.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Next sequence number to allocate.
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Number of packets sent but not yet acknowledged.
    pub fn in_flight(&self) -> u32 {
        self.next_seq - self.base
    }

    /// True when no more packets may be queued.
    pub fn is_full(&self) -> bool {
        self.in_flight() >= self.window_size
    }

    /// True when every queued packet has been acknowledged.
    pub fn is_empty(&self) -> bool {
        self.base == self.next_seq
    }

    /// Stores `payload` at the next free sequence and returns that
    /// sequence number.
    ///
    /// Fails with [`Error::WindowFull`] when the window already holds
    /// `window_size` outstanding packets, and with
    /// [`Error::WindowCollision`] if the target slot still holds a
    /// different pending sequence — a logic error that must abort the
    /// session rather than corrupt the store.
    pub fn insert(&mut self, payload: &[u8]) -> Result<u32> {
        if self.is_full() {
            return Err(Error::WindowFull);
        }

        let seq = self.next_seq;
        let slot = &mut self.slots[slot_index(seq, self.window_size)];
        if slot.valid && slot.sequence != seq {
            return Err(Error::WindowCollision {
                held: slot.sequence,
                incoming: seq,
            });
        }

        slot.fill(seq, payload);
        self.next_seq += 1;
        Ok(seq)
    }

    /// Returns the buffered payload for `seq`, if it is still pending.
    ///
    /// Used for selective (SREJ) and timeout retransmission.
    pub fn retrieve(&self, seq: u32) -> Option<&[u8]> {
        let slot = &self.slots[slot_index(seq, self.window_size)];
        (slot.valid && slot.sequence == seq).then_some(slot.payload.as_slice())
    }

    /// Slides the window forward to `new_base`, invalidating the slots
    /// for every sequence in `[base, new_base)`.
    ///
    /// Sequences at or beyond `new_base` stay pending. Returns the
    /// number of sequences acknowledged; a `new_base` at or behind the
    /// current base is a stale ack and slides nothing.
    pub fn advance(&mut self, new_base: u32) -> u32 {
        if new_base <= self.base {
            return 0;
        }
        debug_assert!(new_base <= self.next_seq, "ack beyond allocated sequences");

        let slid = new_base - self.base;
        while self.base < new_base {
            let index = slot_index(self.base, self.window_size);
            if self.slots[index].valid && self.slots[index].sequence == self.base {
                self.slots[index].valid = false;
            }
            self.base += 1;
        }
        slid
    }

    /// Iterates over every pending `(sequence, payload)` in
    /// `[base, next_seq)`, oldest first.
    pub fn outstanding(&self) -> impl Iterator<Item = (u32, &[u8])> {
        (self.base..self.next_seq).filter_map(|seq| self.retrieve(seq).map(|p| (seq, p)))
    }
}

// ---------------------------------------------------------------------------
// ReceiveWindow
// ---------------------------------------------------------------------------

/// Receive-side window: out-of-order arrivals buffered until the
/// sequence in front of them arrives.
#[derive(Debug)]
pub struct ReceiveWindow {
    slots: Vec<Slot>,
    window_size: u32,
}

impl ReceiveWindow {
    /// Creates a receive window with `window_size` slots.
    pub fn new(window_size: u32) -> Self {
        Self {
            slots: vec![Slot::empty(); window_size as usize],
            window_size,
        }
    }

    /// Number of slots in this window.
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// True when `seq` is admissible relative to the current `expected`
    /// frontier: `expected <= seq < expected + window_size`.
    pub fn contains(&self, expected: u32, seq: u32) -> bool {
        seq >= expected && seq - expected < self.window_size
    }

    /// Buffers an out-of-order arrival.
    ///
    /// Returns `Ok(false)` when the same sequence was already buffered
    /// (a duplicate, harmless), and [`Error::WindowCollision`] when the
    /// slot holds a different pending sequence.
    pub fn buffer(&mut self, seq: u32, payload: &[u8]) -> Result<bool> {
        let slot = &mut self.slots[slot_index(seq, self.window_size)];
        if slot.valid {
            if slot.sequence == seq {
                return Ok(false);
            }
            return Err(Error::WindowCollision {
                held: slot.sequence,
                incoming: seq,
            });
        }

        slot.fill(seq, payload);
        Ok(true)
    }

    /// Flushes every buffered slot that is now contiguous with
    /// `expected`, appending payloads to `out` in sequence order and
    /// invalidating flushed slots.
    ///
    /// Returns the new `expected` frontier — the first sequence for
    /// which no packet is buffered. This is the mechanism that turns
    /// the unordered datagram stream back into an ordered byte stream.
    pub fn drain_contiguous(&mut self, mut expected: u32, out: &mut Vec<u8>) -> u32 {
        loop {
            let slot = &mut self.slots[slot_index(expected, self.window_size)];
            if !slot.valid || slot.sequence != expected {
                return expected;
            }
            out.extend_from_slice(&slot.payload);
            slot.valid = false;
            expected += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_insert_assigns_consecutive_sequences() {
        let mut w = SendWindow::new(4);
        assert_eq!(w.insert(b"a").unwrap(), 0);
        assert_eq!(w.insert(b"b").unwrap(), 1);
        assert_eq!(w.in_flight(), 2);
        assert_eq!(w.retrieve(0), Some(&b"a"[..]));
        assert_eq!(w.retrieve(1), Some(&b"b"[..]));
    }

    #[test]
    fn test_send_window_never_overfills() {
        let mut w = SendWindow::new(2);
        w.insert(b"a").unwrap();
        w.insert(b"b").unwrap();
        assert!(w.is_full());
        assert!(matches!(w.insert(b"c"), Err(Error::WindowFull)));
        assert_eq!(w.in_flight(), 2);
    }

    #[test]
    fn test_send_advance_invalidates_acked_only() {
        let mut w = SendWindow::new(4);
        for p in [b"a", b"b", b"c"] {
            w.insert(p).unwrap();
        }

        assert_eq!(w.advance(2), 2);
        assert_eq!(w.base(), 2);
        assert_eq!(w.retrieve(0), None);
        assert_eq!(w.retrieve(1), None);
        assert_eq!(w.retrieve(2), Some(&b"c"[..]));
    }

    #[test]
    fn test_send_stale_ack_slides_nothing() {
        let mut w = SendWindow::new(4);
        w.insert(b"a").unwrap();
        w.insert(b"b").unwrap();
        w.advance(2);

        assert_eq!(w.advance(2), 0);
        assert_eq!(w.advance(1), 0);
        assert_eq!(w.base(), 2);
    }

    #[test]
    fn test_send_window_reuses_slots_after_advance() {
        let mut w = SendWindow::new(2);
        w.insert(b"a").unwrap();
        w.insert(b"b").unwrap();
        w.advance(2);

        // Sequences 2 and 3 land on the slots 0 and 1 occupied before.
        assert_eq!(w.insert(b"c").unwrap(), 2);
        assert_eq!(w.insert(b"d").unwrap(), 3);
        assert_eq!(w.retrieve(2), Some(&b"c"[..]));
    }

    #[test]
    fn test_send_outstanding_iterates_in_order() {
        let mut w = SendWindow::new(4);
        for p in [b"a", b"b", b"c"] {
            w.insert(p).unwrap();
        }
        w.advance(1);

        let pending: Vec<u32> = w.outstanding().map(|(seq, _)| seq).collect();
        assert_eq!(pending, vec![1, 2]);
    }

    #[test]
    fn test_receive_buffer_and_drain() {
        let mut w = ReceiveWindow::new(4);
        w.buffer(2, b"cc").unwrap();
        w.buffer(1, b"bb").unwrap();

        // Gap at 0: nothing drains yet.
        let mut out = Vec::new();
        assert_eq!(w.drain_contiguous(0, &mut out), 0);
        assert!(out.is_empty());

        // Sequence 0 delivered directly; 1 and 2 drain behind it.
        assert_eq!(w.drain_contiguous(1, &mut out), 3);
        assert_eq!(out, b"bbcc");
    }

    #[test]
    fn test_receive_duplicate_is_harmless() {
        let mut w = ReceiveWindow::new(4);
        assert!(w.buffer(1, b"x").unwrap());
        assert!(!w.buffer(1, b"x").unwrap());
    }

    #[test]
    fn test_receive_collision_is_fatal() {
        let mut w = ReceiveWindow::new(4);
        w.buffer(1, b"x").unwrap();
        // Sequence 5 maps onto the same slot while 1 is still pending.
        assert!(matches!(
            w.buffer(5, b"y"),
            Err(Error::WindowCollision { held: 1, incoming: 5 })
        ));
    }

    #[test]
    fn test_receive_admissible_range() {
        let w = ReceiveWindow::new(4);
        assert!(w.contains(10, 10));
        assert!(w.contains(10, 13));
        assert!(!w.contains(10, 14));
        assert!(!w.contains(10, 9));
    }

    #[test]
    fn test_drained_slots_are_reusable() {
        let mut w = ReceiveWindow::new(2);
        w.buffer(1, b"b").unwrap();
        let mut out = Vec::new();
        assert_eq!(w.drain_contiguous(1, &mut out), 2);

        // Sequence 3 maps onto the freed slot.
        assert!(w.buffer(3, b"d").unwrap());
    }
}
