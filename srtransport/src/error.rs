//! Error type shared across the transfer protocol crate.

use std::fmt;

/// Errors raised by the codec, window store, engines and transport.
#[derive(Debug)]
pub enum Error {
    /// Datagram shorter than the fixed header.
    Truncated,

    /// Internet checksum did not fold to zero; the datagram must be
    /// treated as never having arrived.
    ChecksumMismatch,

    /// Flag byte does not name a known packet kind.
    UnknownKind(u8),

    /// Header plus payload would exceed the transport's datagram ceiling.
    PduTooLarge(usize),

    /// Handshake request payload too short for its declared lengths,
    /// or not valid UTF-8 where a filename is expected.
    MalformedHandshake,

    /// Requested filename exceeds the protocol limit.
    FilenameTooLong(usize),

    /// Session parameters outside their allowed ranges.
    InvalidConfig(&'static str),

    /// A window slot still holds a different unacknowledged sequence.
    ///
    /// This is a window overflow: a protocol logic error, fatal to the
    /// session, never a retryable condition.
    WindowCollision { held: u32, incoming: u32 },

    /// Attempt to queue a packet with the window already full.
    WindowFull,

    /// The peer answered the handshake with `Not Ok`.
    HandshakeRejected,

    /// Consecutive-timeout bound exceeded; the session is abandoned.
    RetriesExhausted,

    /// Underlying socket or file I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "datagram too short for a header"),
            Self::ChecksumMismatch => write!(f, "checksum verification failed"),
            Self::UnknownKind(flag) => write!(f, "unknown packet kind {flag}"),
            Self::PduTooLarge(len) => {
                write!(f, "pdu of {len} bytes exceeds the datagram ceiling")
            }
            Self::MalformedHandshake => write!(f, "malformed handshake payload"),
            Self::FilenameTooLong(len) => write!(f, "filename of {len} bytes too long"),
            Self::InvalidConfig(what) => write!(f, "invalid session config: {what}"),
            Self::WindowCollision { held, incoming } => write!(
                f,
                "window overflow: slot for seq {incoming} still holds pending seq {held}"
            ),
            Self::WindowFull => write!(f, "send window is full"),
            Self::HandshakeRejected => write!(f, "server rejected the transfer request"),
            Self::RetriesExhausted => write!(f, "consecutive timeout bound exceeded"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
