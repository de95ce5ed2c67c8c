//! Reconstructed packets on the read side.

use std::sync::Arc;

use fieldcodec::{Duration, Timestamp};
use schema::{FieldValue, PacketDefinition};
use uuid::Uuid;

/// One packet reconstructed from the stream: its definition, its value row,
/// and its cache identity when the type is cacheable.
///
/// Records are dynamic — fields are reached by name through the typed
/// accessors — so readers can process streams containing types they have no
/// compiled knowledge of.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPacket {
    definition: Arc<PacketDefinition>,
    values: Vec<FieldValue>,
    cache_id: Option<Uuid>,
}

impl RecordPacket {
    pub(crate) fn new(
        definition: Arc<PacketDefinition>,
        values: Vec<FieldValue>,
        cache_id: Option<Uuid>,
    ) -> Self {
        Self {
            definition,
            values,
            cache_id,
        }
    }

    /// The packet's definition.
    #[must_use]
    pub fn definition(&self) -> &PacketDefinition {
        &self.definition
    }

    /// The packet's qualified type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.definition.type_name()
    }

    /// The cache identity, for cacheable packet types.
    #[must_use]
    pub const fn cache_id(&self) -> Option<Uuid> {
        self.cache_id
    }

    /// The raw value row, in definition order.
    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Looks up a value by field name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let index = self
            .definition
            .fields()
            .iter()
            .position(|field| field.name == name)?;
        self.values.get(index)
    }

    /// String accessor; `None` for a missing field or a null string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::String(value) => value.as_deref(),
            _ => None,
        }
    }

    /// Bool accessor.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Signed 32-bit accessor.
    #[must_use]
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            FieldValue::I32(value) => Some(*value),
            _ => None,
        }
    }

    /// Signed 64-bit accessor.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FieldValue::I64(value) => Some(*value),
            _ => None,
        }
    }

    /// Unsigned 32-bit accessor.
    #[must_use]
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            FieldValue::U32(value) => Some(*value),
            _ => None,
        }
    }

    /// Unsigned 64-bit accessor.
    #[must_use]
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            FieldValue::U64(value) => Some(*value),
            _ => None,
        }
    }

    /// Double accessor.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            FieldValue::F64(value) => Some(*value),
            _ => None,
        }
    }

    /// Duration accessor.
    #[must_use]
    pub fn get_duration(&self, name: &str) -> Option<Duration> {
        match self.get(name)? {
            FieldValue::Duration(value) => Some(*value),
            _ => None,
        }
    }

    /// Timestamp accessor.
    #[must_use]
    pub fn get_timestamp(&self, name: &str) -> Option<Timestamp> {
        match self.get(name)? {
            FieldValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// GUID accessor.
    #[must_use]
    pub fn get_guid(&self, name: &str) -> Option<Uuid> {
        match self.get(name)? {
            FieldValue::Guid(value) => Some(*value),
            _ => None,
        }
    }
}
