//! Packet definitions and their wire encoding.

use std::collections::HashSet;

use fieldcodec::{FieldReader, FieldWriter};

use crate::error::{SchemaError, SchemaResult};
use crate::field::{FieldDef, FieldType};
use crate::value::FieldValue;

const FLAG_CACHEABLE: u8 = 1 << 0;
const FLAG_DYNAMIC: u8 = 1 << 1;
const FLAG_RESERVED: u8 = !(FLAG_CACHEABLE | FLAG_DYNAMIC);

/// The schema of one packet type: an ordered list of named, typed fields
/// plus the cacheable/dynamic flags.
///
/// Within one stream, two packets of the same type must produce equal
/// definitions, and a given definition index resolves to the same definition
/// for the stream's whole life. The definition itself is encoded onto the
/// wire once, at the type's first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketDefinition {
    type_name: String,
    version: u32,
    cacheable: bool,
    dynamic: bool,
    fields: Vec<FieldDef>,
}

impl PacketDefinition {
    /// Starts a definition with no fields.
    #[must_use]
    pub fn new(type_name: impl Into<String>, version: u32) -> Self {
        Self {
            type_name: type_name.into(),
            version,
            cacheable: false,
            dynamic: false,
            fields: Vec::new(),
        }
    }

    /// Marks the type cacheable: instances are written at most once per
    /// stream and carry an identity GUID on the wire.
    #[must_use]
    pub fn cacheable(mut self) -> Self {
        self.cacheable = true;
        self
    }

    /// Marks the type dynamic: the type name is supplied per instance
    /// rather than by a static type.
    #[must_use]
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, field_type));
        self
    }

    /// The qualified type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The application-defined definition version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Whether instances are deduplicated per stream.
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    /// Whether the type name is per-instance.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// The ordered fields.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Validates definition invariants: a non-empty name and unique field
    /// names.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.type_name.is_empty() {
            return Err(SchemaError::EmptyTypeName);
        }
        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateFieldName {
                    type_name: self.type_name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Encodes the full definition: name, version, flags, then each field's
    /// name and type code.
    pub fn encode(&self, writer: &mut FieldWriter) -> SchemaResult<()> {
        writer.write_string(Some(&self.type_name))?;
        writer.write_u32(self.version);
        let mut flags = 0u8;
        if self.cacheable {
            flags |= FLAG_CACHEABLE;
        }
        if self.dynamic {
            flags |= FLAG_DYNAMIC;
        }
        writer.write_u8(flags);
        writer.write_u32(self.fields.len() as u32);
        for field in &self.fields {
            writer.write_string(Some(&field.name))?;
            writer.write_u8(field.field_type.code());
        }
        Ok(())
    }

    /// Decodes a definition from the wire and validates it.
    pub fn decode(reader: &mut FieldReader<'_>) -> SchemaResult<Self> {
        let type_name = reader.read_string()?.ok_or(SchemaError::NullTypeName)?;
        let version = reader.read_u32()?;
        let flags = reader.read_u8()?;
        if flags & FLAG_RESERVED != 0 {
            return Err(SchemaError::InvalidFlags { flags });
        }
        let field_count = reader.read_u32()?;
        let mut fields = Vec::with_capacity(field_count.min(256) as usize);
        for _ in 0..field_count {
            let name = reader.read_string()?.ok_or(SchemaError::NullTypeName)?;
            let code = reader.read_u8()?;
            let field_type =
                FieldType::from_code(code).ok_or(SchemaError::UnknownFieldCode { code })?;
            fields.push(FieldDef::new(name, field_type));
        }
        let definition = Self {
            type_name,
            version,
            cacheable: flags & FLAG_CACHEABLE != 0,
            dynamic: flags & FLAG_DYNAMIC != 0,
            fields,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Serializes a value row against this definition, type-checking every
    /// value along the way.
    pub fn write_values(
        &self,
        values: &[FieldValue],
        writer: &mut FieldWriter,
    ) -> SchemaResult<()> {
        if values.len() != self.fields.len() {
            return Err(SchemaError::ValueCountMismatch {
                type_name: self.type_name.clone(),
                expected: self.fields.len(),
                actual: values.len(),
            });
        }
        for (field, value) in self.fields.iter().zip(values) {
            if value.field_type() != field.field_type {
                return Err(SchemaError::ValueTypeMismatch {
                    type_name: self.type_name.clone(),
                    field: field.name.clone(),
                    expected: field.field_type,
                    actual: value.field_type(),
                });
            }
            match value {
                FieldValue::Bool(v) => writer.write_bool(*v),
                FieldValue::String(v) => writer.write_string(v.as_deref())?,
                FieldValue::I32(v) => writer.write_i32(*v),
                FieldValue::I64(v) => writer.write_i64(*v),
                FieldValue::U32(v) => writer.write_u32(*v),
                FieldValue::U64(v) => writer.write_u64(*v),
                FieldValue::F64(v) => writer.write_f64(*v),
                FieldValue::Duration(v) => writer.write_duration(*v),
                FieldValue::Timestamp(v) => writer.write_timestamp(*v),
                FieldValue::Guid(v) => writer.write_guid(*v),
                FieldValue::BoolArray(v) => writer.write_bool_array(v)?,
                FieldValue::StringArray(v) => writer.write_string_array(v)?,
                FieldValue::I32Array(v) => writer.write_i32_array(v)?,
                FieldValue::I64Array(v) => writer.write_i64_array(v)?,
                FieldValue::U32Array(v) => writer.write_u32_array(v)?,
                FieldValue::U64Array(v) => writer.write_u64_array(v)?,
                FieldValue::F64Array(v) => writer.write_f64_array(v)?,
                FieldValue::DurationArray(v) => writer.write_duration_array(v)?,
                FieldValue::TimestampArray(v) => writer.write_timestamp_array(v)?,
                FieldValue::GuidArray(v) => writer.write_guid_array(v)?,
            }
        }
        Ok(())
    }

    /// Deserializes a value row against this definition.
    pub fn read_values(&self, reader: &mut FieldReader<'_>) -> SchemaResult<Vec<FieldValue>> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match field.field_type {
                FieldType::Bool => FieldValue::Bool(reader.read_bool()?),
                FieldType::String => FieldValue::String(reader.read_string()?),
                FieldType::I32 => FieldValue::I32(reader.read_i32()?),
                FieldType::I64 => FieldValue::I64(reader.read_i64()?),
                FieldType::U32 => FieldValue::U32(reader.read_u32()?),
                FieldType::U64 => FieldValue::U64(reader.read_u64()?),
                FieldType::F64 => FieldValue::F64(reader.read_f64()?),
                FieldType::Duration => FieldValue::Duration(reader.read_duration()?),
                FieldType::Timestamp => FieldValue::Timestamp(reader.read_timestamp()?),
                FieldType::Guid => FieldValue::Guid(reader.read_guid()?),
                FieldType::BoolArray => FieldValue::BoolArray(reader.read_bool_array()?),
                FieldType::StringArray => FieldValue::StringArray(reader.read_string_array()?),
                FieldType::I32Array => FieldValue::I32Array(reader.read_i32_array()?),
                FieldType::I64Array => FieldValue::I64Array(reader.read_i64_array()?),
                FieldType::U32Array => FieldValue::U32Array(reader.read_u32_array()?),
                FieldType::U64Array => FieldValue::U64Array(reader.read_u64_array()?),
                FieldType::F64Array => FieldValue::F64Array(reader.read_f64_array()?),
                FieldType::DurationArray => {
                    FieldValue::DurationArray(reader.read_duration_array()?)
                }
                FieldType::TimestampArray => {
                    FieldValue::TimestampArray(reader.read_timestamp_array()?)
                }
                FieldType::GuidArray => FieldValue::GuidArray(reader.read_guid_array()?),
            };
            values.push(value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcodec::{shared_table, ProtocolVersion, Timestamp};
    use std::rc::Rc;

    fn sample_definition() -> PacketDefinition {
        PacketDefinition::new("Diagnostics.LogMessage", 2)
            .field("sequence", FieldType::I64)
            .field("severity", FieldType::I32)
            .field("caption", FieldType::String)
            .field("logged_at", FieldType::Timestamp)
    }

    #[test]
    fn builder_accessors() {
        let def = sample_definition().cacheable();
        assert_eq!(def.type_name(), "Diagnostics.LogMessage");
        assert_eq!(def.version(), 2);
        assert!(def.is_cacheable());
        assert!(!def.is_dynamic());
        assert_eq!(def.fields().len(), 4);
    }

    #[test]
    fn validate_rejects_empty_name() {
        let def = PacketDefinition::new("", 1);
        assert_eq!(def.validate(), Err(SchemaError::EmptyTypeName));
    }

    #[test]
    fn validate_rejects_duplicate_fields() {
        let def = PacketDefinition::new("T", 1)
            .field("x", FieldType::Bool)
            .field("x", FieldType::I32);
        assert!(matches!(
            def.validate(),
            Err(SchemaError::DuplicateFieldName { .. })
        ));
    }

    #[test]
    fn encode_decode_roundtrip() {
        let def = sample_definition().cacheable().dynamic();
        let strings = shared_table();
        let mut writer = FieldWriter::new(ProtocolVersion::CURRENT, Rc::clone(&strings));
        def.encode(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let read_strings = shared_table();
        let mut reader = FieldReader::new(&bytes, ProtocolVersion::CURRENT, read_strings);
        let decoded = PacketDefinition::decode(&mut reader).unwrap();
        assert_eq!(decoded, def);
        assert!(reader.is_empty());
    }

    #[test]
    fn identical_shapes_encode_identically() {
        let encode = |def: &PacketDefinition| {
            let mut writer = FieldWriter::new(ProtocolVersion::CURRENT, shared_table());
            def.encode(&mut writer).unwrap();
            writer.into_bytes()
        };
        assert_eq!(encode(&sample_definition()), encode(&sample_definition()));
    }

    #[test]
    fn decode_rejects_reserved_flags() {
        let strings = shared_table();
        let mut writer = FieldWriter::new(ProtocolVersion::CURRENT, Rc::clone(&strings));
        writer.write_string(Some("T")).unwrap();
        writer.write_u32(1);
        writer.write_u8(0x04); // reserved bit
        writer.write_u32(0);
        let bytes = writer.into_bytes();

        let mut reader = FieldReader::new(&bytes, ProtocolVersion::CURRENT, shared_table());
        assert!(matches!(
            PacketDefinition::decode(&mut reader),
            Err(SchemaError::InvalidFlags { flags: 0x04 })
        ));
    }

    #[test]
    fn decode_rejects_unknown_field_code() {
        let strings = shared_table();
        let mut writer = FieldWriter::new(ProtocolVersion::CURRENT, Rc::clone(&strings));
        writer.write_string(Some("T")).unwrap();
        writer.write_u32(1);
        writer.write_u8(0);
        writer.write_u32(1);
        writer.write_string(Some("f")).unwrap();
        writer.write_u8(0x55);
        let bytes = writer.into_bytes();

        let mut reader = FieldReader::new(&bytes, ProtocolVersion::CURRENT, shared_table());
        assert!(matches!(
            PacketDefinition::decode(&mut reader),
            Err(SchemaError::UnknownFieldCode { code: 0x55 })
        ));
    }

    #[test]
    fn value_roundtrip() {
        let def = sample_definition();
        let values = vec![
            FieldValue::I64(42),
            FieldValue::I32(-3),
            FieldValue::String(Some("ready".to_owned())),
            FieldValue::Timestamp(Timestamp::utc(1_000_000)),
        ];
        let strings = shared_table();
        let mut writer = FieldWriter::new(ProtocolVersion::CURRENT, Rc::clone(&strings));
        def.write_values(&values, &mut writer).unwrap();
        let bytes = writer.into_bytes();

        let read_strings = shared_table();
        let mut reader = FieldReader::new(&bytes, ProtocolVersion::CURRENT, read_strings);
        let decoded = def.read_values(&mut reader).unwrap();
        assert_eq!(decoded, values);
        assert!(reader.is_empty());
    }

    #[test]
    fn write_values_rejects_wrong_count() {
        let def = sample_definition();
        let mut writer = FieldWriter::new(ProtocolVersion::CURRENT, shared_table());
        let err = def.write_values(&[FieldValue::I64(1)], &mut writer).unwrap_err();
        assert!(matches!(err, SchemaError::ValueCountMismatch { .. }));
    }

    #[test]
    fn write_values_rejects_wrong_type() {
        let def = sample_definition();
        let values = vec![
            FieldValue::I64(42),
            FieldValue::Bool(true), // severity expects I32
            FieldValue::String(None),
            FieldValue::Timestamp(Timestamp::utc(0)),
        ];
        let mut writer = FieldWriter::new(ProtocolVersion::CURRENT, shared_table());
        let err = def.write_values(&values, &mut writer).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ValueTypeMismatch {
                expected: FieldType::I32,
                actual: FieldType::Bool,
                ..
            }
        ));
    }
}
