//! The packet abstraction implemented by serializable record types.

use uuid::Uuid;

use crate::definition::PacketDefinition;
use crate::value::FieldValue;

/// A serializable record: a log message, a metric sample, a session
/// summary, or any other application state written to a session stream.
///
/// Types declare their schema explicitly through
/// [`definition`](Self::definition) — there is no reflection. The contract:
///
/// - `definition().type_name()` equals [`type_name`](Self::type_name), and
///   two instances of the same type produce equal definitions.
/// - [`field_values`](Self::field_values) returns one value per definition
///   field, in definition order.
/// - [`dependencies`](Self::dependencies) lists packets that must be on the
///   stream before this one (a sample's metric definition, for instance).
/// - [`cache_id`](Self::cache_id) returns `Some` for cacheable instances;
///   the id is the per-stream write-once identity. A cacheable definition
///   and a `Some` cache id go together.
///
/// Dynamic record families return a per-instance `type_name`, which is why
/// the name is a method rather than an associated constant.
pub trait Packet {
    /// The qualified type name used for definition caching.
    fn type_name(&self) -> &str;

    /// Builds this type's packet definition.
    fn definition(&self) -> PacketDefinition;

    /// The instance's field values, ordered to match the definition.
    fn field_values(&self) -> Vec<FieldValue>;

    /// Packets that must be serialized before this one.
    fn dependencies(&self) -> Vec<&dyn Packet> {
        Vec::new()
    }

    /// Write-once identity for cacheable packets.
    fn cache_id(&self) -> Option<Uuid> {
        None
    }
}
