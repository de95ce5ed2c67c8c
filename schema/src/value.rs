//! Runtime field values.

use fieldcodec::{Duration, Timestamp};
use uuid::Uuid;

use crate::field::FieldType;

/// One field's value at runtime.
///
/// A row of these, ordered to match a packet definition, is the unit the
/// packet writer serializes and the packet reader reconstructs. Strings are
/// `Option` because the wire distinguishes null from empty.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    String(Option<String>),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F64(f64),
    Duration(Duration),
    Timestamp(Timestamp),
    Guid(Uuid),
    BoolArray(Vec<bool>),
    StringArray(Vec<Option<String>>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    U32Array(Vec<u32>),
    U64Array(Vec<u64>),
    F64Array(Vec<f64>),
    DurationArray(Vec<Duration>),
    TimestampArray(Vec<Timestamp>),
    GuidArray(Vec<Uuid>),
}

impl FieldValue {
    /// The field type this value inhabits.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Bool(_) => FieldType::Bool,
            Self::String(_) => FieldType::String,
            Self::I32(_) => FieldType::I32,
            Self::I64(_) => FieldType::I64,
            Self::U32(_) => FieldType::U32,
            Self::U64(_) => FieldType::U64,
            Self::F64(_) => FieldType::F64,
            Self::Duration(_) => FieldType::Duration,
            Self::Timestamp(_) => FieldType::Timestamp,
            Self::Guid(_) => FieldType::Guid,
            Self::BoolArray(_) => FieldType::BoolArray,
            Self::StringArray(_) => FieldType::StringArray,
            Self::I32Array(_) => FieldType::I32Array,
            Self::I64Array(_) => FieldType::I64Array,
            Self::U32Array(_) => FieldType::U32Array,
            Self::U64Array(_) => FieldType::U64Array,
            Self::F64Array(_) => FieldType::F64Array,
            Self::DurationArray(_) => FieldType::DurationArray,
            Self::TimestampArray(_) => FieldType::TimestampArray,
            Self::GuidArray(_) => FieldType::GuidArray,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(Some(value.to_owned()))
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        Self::String(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::U32(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<Duration> for FieldValue {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Guid(value)
    }
}
