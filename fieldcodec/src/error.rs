//! Error types for field-level encoding and decoding.

use std::fmt;

/// Result type for field codec operations.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors that can occur while encoding or decoding field values.
///
/// [`UnexpectedEnd`](Self::UnexpectedEnd) means the bytes simply ran out
/// (truncation); every other variant means the bytes present are not a valid
/// encoding (corruption). The two must stay distinguishable so callers can
/// report a truncated stream differently from a damaged one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldError {
    /// Attempted to read past the end of the input.
    UnexpectedEnd { requested: usize, available: usize },

    /// A variable-length integer exceeded its maximum encoded size.
    InvalidVarint { max_bytes: usize },

    /// A signed varint decoded to a magnitude outside the target type.
    SignedOverflow { magnitude: u64, negative: bool },

    /// A declared string or array length cannot be satisfied by the
    /// remaining bytes.
    LengthOutOfRange { length: u64, available: usize },

    /// String bytes were not valid UTF-8.
    InvalidUtf8 { position: usize },

    /// A boolean field held a byte other than 0 or 1.
    InvalidBool { value: u8 },

    /// Unknown timestamp encoding tag.
    UnknownTimestampTag { tag: u8 },

    /// A string-table token referenced an entry that does not exist.
    UnknownStringToken { token: u32, known: usize },

    /// A delta-encoded timestamp arrived before any reference time was set.
    MissingTimeReference,

    /// A factor-delta timestamp arrived before any factor was set.
    MissingTimeFactor,

    /// Timestamp delta arithmetic overflowed the tick range.
    TickOverflow { reference: i64, delta: u64 },

    /// A bit-packed bool array carried the wrong number of words.
    WordCountMismatch { expected: usize, actual: usize },
}

impl FieldError {
    /// Returns `true` if this error indicates plain truncation rather than
    /// a corrupt encoding.
    #[must_use]
    pub const fn is_truncation(&self) -> bool {
        matches!(self, Self::UnexpectedEnd { .. })
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd {
                requested,
                available,
            } => {
                write!(
                    f,
                    "unexpected end of input: need {requested} bytes, have {available}"
                )
            }
            Self::InvalidVarint { max_bytes } => {
                write!(f, "varint exceeds its maximum of {max_bytes} bytes")
            }
            Self::SignedOverflow {
                magnitude,
                negative,
            } => {
                let sign = if *negative { "-" } else { "+" };
                write!(f, "signed magnitude {sign}{magnitude} out of range")
            }
            Self::LengthOutOfRange { length, available } => {
                write!(
                    f,
                    "declared length {length} exceeds {available} remaining bytes"
                )
            }
            Self::InvalidUtf8 { position } => {
                write!(f, "invalid UTF-8 in string at byte {position}")
            }
            Self::InvalidBool { value } => {
                write!(f, "invalid boolean byte 0x{value:02X}")
            }
            Self::UnknownTimestampTag { tag } => {
                write!(f, "unknown timestamp encoding tag {tag}")
            }
            Self::UnknownStringToken { token, known } => {
                write!(
                    f,
                    "string token {token} references an unknown entry ({known} known)"
                )
            }
            Self::MissingTimeReference => {
                write!(f, "timestamp delta encountered before a reference time")
            }
            Self::MissingTimeFactor => {
                write!(f, "factor timestamp delta encountered before a factor")
            }
            Self::TickOverflow { reference, delta } => {
                write!(
                    f,
                    "timestamp delta {delta} overflows ticks from reference {reference}"
                )
            }
            Self::WordCountMismatch { expected, actual } => {
                write!(
                    f,
                    "bool array carries {actual} packed words, expected {expected}"
                )
            }
        }
    }
}

impl std::error::Error for FieldError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_distinguished_from_corruption() {
        let eof = FieldError::UnexpectedEnd {
            requested: 4,
            available: 1,
        };
        assert!(eof.is_truncation());

        let bad = FieldError::InvalidVarint { max_bytes: 5 };
        assert!(!bad.is_truncation());
    }

    #[test]
    fn display_unexpected_end() {
        let err = FieldError::UnexpectedEnd {
            requested: 16,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("16"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn display_length_out_of_range() {
        let err = FieldError::LengthOutOfRange {
            length: 1000,
            available: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<FieldError>();
    }
}
