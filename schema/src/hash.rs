//! Deterministic definition fingerprints.

use blake3::Hasher;

use crate::definition::PacketDefinition;

/// Computes a deterministic 64-bit fingerprint of a packet definition.
///
/// Used to cross-check that two definitions registered under one type name
/// describe the same shape. The hash covers the name, version, flags, and
/// every field's name and type code, all length-delimited so adjacent
/// fields cannot alias.
#[must_use]
pub fn definition_hash(definition: &PacketDefinition) -> u64 {
    let mut hasher = Hasher::new();
    write_str(&mut hasher, definition.type_name());
    write_u32(&mut hasher, definition.version());
    write_u8(&mut hasher, u8::from(definition.is_cacheable()));
    write_u8(&mut hasher, u8::from(definition.is_dynamic()));
    write_u32(&mut hasher, definition.fields().len() as u32);
    for field in definition.fields() {
        write_str(&mut hasher, &field.name);
        write_u8(&mut hasher, field.field_type.code());
    }

    let hash = hasher.finalize();
    let bytes = hash.as_bytes();
    u64::from_le_bytes(bytes[0..8].try_into().unwrap())
}

fn write_str(hasher: &mut Hasher, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn base() -> PacketDefinition {
        PacketDefinition::new("Metrics.Sample", 1)
            .field("value", FieldType::F64)
            .field("recorded_at", FieldType::Timestamp)
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(definition_hash(&base()), definition_hash(&base()));
    }

    #[test]
    fn hash_changes_with_field_order() {
        let reordered = PacketDefinition::new("Metrics.Sample", 1)
            .field("recorded_at", FieldType::Timestamp)
            .field("value", FieldType::F64);
        assert_ne!(definition_hash(&base()), definition_hash(&reordered));
    }

    #[test]
    fn hash_changes_with_flags() {
        assert_ne!(definition_hash(&base()), definition_hash(&base().cacheable()));
    }

    #[test]
    fn hash_changes_with_field_type() {
        let retyped = PacketDefinition::new("Metrics.Sample", 1)
            .field("value", FieldType::I64)
            .field("recorded_at", FieldType::Timestamp);
        assert_ne!(definition_hash(&base()), definition_hash(&retyped));
    }

    #[test]
    fn hash_changes_with_version() {
        let bumped = PacketDefinition::new("Metrics.Sample", 2)
            .field("value", FieldType::F64)
            .field("recorded_at", FieldType::Timestamp);
        assert_ne!(definition_hash(&base()), definition_hash(&bumped));
    }
}
