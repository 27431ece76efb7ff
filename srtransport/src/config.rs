//! Session parameters negotiated once at handshake.

use crate::error::{Error, Result};
use crate::{MAX_PAYLOAD_SIZE, MAX_WINDOW_SIZE};

/// Window and chunk sizes for one transfer session.
///
/// Both sides must agree on these; they are carried in the handshake
/// request and fixed for the life of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Number of packets that may be outstanding at once.
    pub window_size: u32,

    /// Payload bytes per data packet.
    pub buffer_size: u32,
}

impl SessionConfig {
    /// Creates a config, validating both parameters.
    pub fn new(window_size: u32, buffer_size: u32) -> Result<Self> {
        if window_size == 0 || window_size > MAX_WINDOW_SIZE {
            return Err(Error::InvalidConfig("window size out of range"));
        }
        if buffer_size == 0 || buffer_size as usize > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidConfig("buffer size out of range"));
        }
        Ok(Self {
            window_size,
            buffer_size,
        })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: crate::DEFAULT_WINDOW_SIZE,
            buffer_size: crate::DEFAULT_BUFFER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bounds() {
        assert!(SessionConfig::new(1, 1).is_ok());
        assert!(SessionConfig::new(MAX_WINDOW_SIZE, MAX_PAYLOAD_SIZE as u32).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(SessionConfig::new(0, 100).is_err());
        assert!(SessionConfig::new(MAX_WINDOW_SIZE + 1, 100).is_err());
        assert!(SessionConfig::new(4, 0).is_err());
        assert!(SessionConfig::new(4, MAX_PAYLOAD_SIZE as u32 + 1).is_err());
    }
}
