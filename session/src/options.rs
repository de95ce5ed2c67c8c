//! Session-level configuration.

use fieldcodec::ProtocolVersion;
use wire::{WireLimits, DEFAULT_BUFFER_SIZE};

/// Options for session file readers and writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Protocol version to write (readers take the version from the file).
    pub version: ProtocolVersion,
    /// Wire limits applied to every packet frame.
    pub limits: WireLimits,
    /// Chunk size for read-side buffering.
    pub buffer_size: usize,
}

impl SessionOptions {
    /// Options sized for tests: small buffers to exercise chunk boundaries.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            version: ProtocolVersion::CURRENT,
            limits: WireLimits::for_testing(),
            buffer_size: 64,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::CURRENT,
            limits: WireLimits::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_current_protocol() {
        let options = SessionOptions::default();
        assert_eq!(options.version, ProtocolVersion::CURRENT);
        assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn testing_buffers_are_tiny() {
        assert!(SessionOptions::for_testing().buffer_size < 1024);
    }
}
