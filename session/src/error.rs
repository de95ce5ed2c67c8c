//! Error types for packet stream and session file operations.

use std::fmt;
use std::io;

use fieldcodec::FieldError;
use schema::SchemaError;
use wire::WireError;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors from the packet writer/reader and the session file layer.
#[derive(Debug)]
#[non_exhaustive]
pub enum SessionError {
    /// Underlying I/O failure.
    Io(io::Error),

    /// Field codec error.
    Field(FieldError),

    /// Schema or definition error.
    Schema(SchemaError),

    /// Framing or header error.
    Wire(WireError),

    /// A packet declared a cacheable definition but supplied no cache id.
    CacheableWithoutId { type_name: String },

    /// A packet payload had bytes left over after its fields were read.
    TrailingPacketBytes { type_name: String, remaining: usize },

    /// The stream ended in the middle of a packet.
    TruncatedStream { pending: usize },

    /// An operation was attempted on a closed writer.
    WriterClosed,
}

impl SessionError {
    /// Returns `true` if this error indicates the byte stream is damaged
    /// (as opposed to plain I/O failure or truncation).
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Field(err) => !err.is_truncation(),
            Self::Schema(_) | Self::Wire(_) | Self::TrailingPacketBytes { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::Field(err) => write!(f, "field codec error: {err}"),
            Self::Schema(err) => write!(f, "schema error: {err}"),
            Self::Wire(err) => write!(f, "wire error: {err}"),
            Self::CacheableWithoutId { type_name } => {
                write!(
                    f,
                    "cacheable packet type {type_name:?} supplied no cache id"
                )
            }
            Self::TrailingPacketBytes {
                type_name,
                remaining,
            } => {
                write!(
                    f,
                    "{remaining} bytes left over after reading {type_name:?} packet"
                )
            }
            Self::TruncatedStream { pending } => {
                write!(
                    f,
                    "stream ended mid-packet with {pending} bytes pending"
                )
            }
            Self::WriterClosed => write!(f, "session writer is closed"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Field(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::Wire(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<FieldError> for SessionError {
    fn from(err: FieldError) -> Self {
        Self::Field(err)
    }
}

impl From<SchemaError> for SessionError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<WireError> for SessionError {
    fn from(err: WireError) -> Self {
        Self::Wire(err)
    }
}
