//! Error types for schema operations.

use std::fmt;

use fieldcodec::FieldError;

use crate::field::FieldType;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while building, encoding, or applying packet
/// definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// Field codec error while encoding or decoding a definition or row.
    Field(FieldError),

    /// A packet definition had an empty type name.
    EmptyTypeName,

    /// A definition decoded from the wire carried a null type name.
    NullTypeName,

    /// Two fields in one definition share a name.
    DuplicateFieldName { type_name: String, field: String },

    /// Unknown field type code on the wire.
    UnknownFieldCode { code: u8 },

    /// Reserved definition flag bits were set.
    InvalidFlags { flags: u8 },

    /// A type name was re-registered with a different shape.
    ShapeConflict { type_name: String },

    /// A definition index resolved to nothing.
    UnknownDefinitionIndex { index: u32, known: usize },

    /// A value row had the wrong number of values for its definition.
    ValueCountMismatch {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// A value's type did not match its field definition.
    ValueTypeMismatch {
        type_name: String,
        field: String,
        expected: FieldType,
        actual: FieldType,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(err) => write!(f, "field codec error: {err}"),
            Self::EmptyTypeName => write!(f, "packet definition has an empty type name"),
            Self::NullTypeName => write!(f, "packet definition decoded a null type name"),
            Self::DuplicateFieldName { type_name, field } => {
                write!(f, "duplicate field {field:?} in definition {type_name:?}")
            }
            Self::UnknownFieldCode { code } => {
                write!(f, "unknown field type code 0x{code:02X}")
            }
            Self::InvalidFlags { flags } => {
                write!(f, "reserved definition flag bits set: 0x{flags:02X}")
            }
            Self::ShapeConflict { type_name } => {
                write!(f, "type {type_name:?} re-registered with a different shape")
            }
            Self::UnknownDefinitionIndex { index, known } => {
                write!(f, "definition index {index} out of range ({known} known)")
            }
            Self::ValueCountMismatch {
                type_name,
                expected,
                actual,
            } => {
                write!(f, "{type_name:?} expects {expected} values, got {actual}")
            }
            Self::ValueTypeMismatch {
                type_name,
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{type_name:?} field {field:?} expects {expected:?}, got {actual:?}"
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Field(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FieldError> for SchemaError {
    fn from(err: FieldError) -> Self {
        Self::Field(err)
    }
}
