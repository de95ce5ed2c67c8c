//! The packet reader: replays definitions and reconstructs records.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use fieldcodec::{shared_table, FieldReader, ProtocolVersion, SharedStringTable};
use schema::{PacketDefinition, PacketDefinitionList, SchemaError};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::record::RecordPacket;

/// Decodes packet payloads in stream order, replaying the writer's
/// definition and string-table insertions.
///
/// Indices are positional: a payload whose type index equals the number of
/// known definitions introduces a new definition inline; a smaller index
/// references an earlier one; a larger index means the stream is corrupt.
#[derive(Debug)]
pub struct PacketReader {
    version: ProtocolVersion,
    definitions: PacketDefinitionList,
    strings: SharedStringTable,
    cache: HashMap<Uuid, RecordPacket>,
}

impl PacketReader {
    /// Creates a reader for the given protocol version.
    #[must_use]
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            definitions: PacketDefinitionList::new(),
            strings: shared_table(),
            cache: HashMap::new(),
        }
    }

    /// The protocol version being read.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Number of definitions replayed so far.
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Looks up a previously read cacheable packet by identity.
    #[must_use]
    pub fn cached(&self, id: &Uuid) -> Option<&RecordPacket> {
        self.cache.get(id)
    }

    /// Decodes one packet payload (framing already stripped).
    pub fn read_packet(&mut self, payload: &[u8]) -> SessionResult<RecordPacket> {
        let mut fields = FieldReader::new(payload, self.version, Rc::clone(&self.strings));

        let index = fields.read_u32()?;
        let known = self.definitions.len();
        let definition: Arc<PacketDefinition> = if index as usize == known {
            let decoded = PacketDefinition::decode(&mut fields)?;
            let type_name = decoded.type_name().to_owned();
            let (new_index, is_new) = self.definitions.stage(decoded)?;
            if !is_new || new_index != index {
                // The stream re-announced a type it already defined.
                self.definitions.rollback();
                return Err(SessionError::Schema(SchemaError::ShapeConflict {
                    type_name,
                }));
            }
            self.definitions.commit();
            self.definitions.get(new_index).cloned().ok_or(
                SessionError::Schema(SchemaError::UnknownDefinitionIndex {
                    index: new_index,
                    known: self.definitions.len(),
                }),
            )?
        } else {
            self.definitions
                .get(index)
                .cloned()
                .ok_or(SessionError::Schema(SchemaError::UnknownDefinitionIndex {
                    index,
                    known,
                }))?
        };

        let cache_id = if definition.is_cacheable() {
            Some(fields.read_guid()?)
        } else {
            None
        };
        let values = definition.read_values(&mut fields)?;
        if !fields.is_empty() {
            return Err(SessionError::TrailingPacketBytes {
                type_name: definition.type_name().to_owned(),
                remaining: fields.remaining(),
            });
        }
        self.strings.borrow_mut().commit();

        let record = RecordPacket::new(definition, values, cache_id);
        if let Some(id) = cache_id {
            self.cache.insert(id, record.clone());
        }
        Ok(record)
    }
}
