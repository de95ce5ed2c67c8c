//! Error types for wire framing and header operations.

use std::fmt;

use fieldcodec::FieldError;

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors for packet framing, buffer reassembly, and header codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WireError {
    /// Field codec error inside a header or length prefix.
    Field(FieldError),

    /// The file does not start with the GLF magic code.
    InvalidMagic { found: [u8; 8] },

    /// The file's protocol version is not supported.
    UnsupportedVersion { major: u16, minor: u16 },

    /// Not enough bytes for a fixed-size header.
    HeaderTooSmall { actual: usize, required: usize },

    /// A packet frame declared a zero length.
    EmptyPacket,

    /// A packet frame exceeds the configured limit.
    PacketTooLarge { length: usize, limit: usize },

    /// The file header's data offset is inconsistent with the session
    /// header that follows it.
    InvalidDataOffset { offset: u32, expected: u64 },

    /// A session header re-encode produced a different byte length.
    HeaderSizeChanged { expected: usize, actual: usize },

    /// A declared header or string length runs past the available bytes.
    Truncated { needed: usize, available: usize },

    /// A status or flag field held an unknown code.
    UnknownStatus { code: u32 },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(err) => write!(f, "field codec error: {err}"),
            Self::InvalidMagic { found } => {
                write!(f, "invalid magic code: {found:02X?}")
            }
            Self::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported protocol version {major}.{minor}")
            }
            Self::HeaderTooSmall { actual, required } => {
                write!(f, "header too small: {actual} bytes, need {required}")
            }
            Self::EmptyPacket => write!(f, "packet frame declares zero length"),
            Self::PacketTooLarge { length, limit } => {
                write!(f, "packet of {length} bytes exceeds limit {limit}")
            }
            Self::InvalidDataOffset { offset, expected } => {
                write!(
                    f,
                    "data offset {offset} does not match header end {expected}"
                )
            }
            Self::HeaderSizeChanged { expected, actual } => {
                write!(
                    f,
                    "session header re-encoded to {actual} bytes, expected {expected}"
                )
            }
            Self::Truncated { needed, available } => {
                write!(f, "truncated: need {needed} bytes, have {available}")
            }
            Self::UnknownStatus { code } => {
                write!(f, "unknown session status code {code}")
            }
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Field(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FieldError> for WireError {
    fn from(err: FieldError) -> Self {
        Self::Field(err)
    }
}
