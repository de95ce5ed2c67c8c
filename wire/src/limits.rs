//! Wire-level limits.

/// Default read-side buffer capacity in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 131_072;

/// Fixed increment used when a partial packet forces buffer growth.
pub const BUFFER_INCREMENT: usize = 131_072;

/// Limits applied while framing and reassembling packets.
///
/// The packet size limit is the line between a large-but-legitimate frame
/// and a corrupt length prefix that would otherwise make the reader wait
/// for gigabytes that never arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLimits {
    /// Maximum payload bytes in one packet frame.
    pub max_packet_bytes: usize,
}

impl WireLimits {
    /// Conservative limits for tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_packet_bytes: 64 * 1024,
        }
    }
}

impl Default for WireLimits {
    fn default() -> Self {
        Self {
            max_packet_bytes: 16 * 1024 * 1024,
        }
    }
}
