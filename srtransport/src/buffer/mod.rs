//! Buffer management for the transfer protocol.
//!
//! - SendWindow: sliding window of payloads awaiting acknowledgment
//! - ReceiveWindow: out-of-order arrivals awaiting contiguous delivery

mod window;

pub use window::{ReceiveWindow, SendWindow};
