//! Selective-repeat ARQ state machines, one per transfer direction.
//!
//! Both engines manage protocol state only; socket and file I/O is the
//! caller's responsibility. The [`crate::session`] drivers wire them to
//! a transport endpoint.

mod receiver;
mod sender;

pub use receiver::{Delivery, ReceiverEngine, ReceiverPhase};
pub use sender::{SenderEngine, SenderPhase};
