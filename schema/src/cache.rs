//! The per-stream packet definition list.

use std::collections::HashMap;
use std::sync::Arc;

use crate::definition::PacketDefinition;
use crate::error::{SchemaError, SchemaResult};
use crate::hash::definition_hash;

/// Ordered collection of packet definitions seen on one stream.
///
/// A definition's position is its wire index: the first type registered is
/// index 0, the next 1, and so on, identically on the write and read sides.
/// New definitions are staged and only become permanent on
/// [`commit`](Self::commit); a failed packet write calls
/// [`rollback`](Self::rollback) so the list matches what actually reached
/// the stream.
#[derive(Debug, Default)]
pub struct PacketDefinitionList {
    definitions: Vec<Arc<PacketDefinition>>,
    by_name: HashMap<String, u32>,
    committed_len: usize,
}

impl PacketDefinitionList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of definitions, including staged ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Looks up a definition by wire index.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&Arc<PacketDefinition>> {
        self.definitions.get(index as usize)
    }

    /// Looks up the wire index assigned to a type name.
    #[must_use]
    pub fn index_of(&self, type_name: &str) -> Option<u32> {
        self.by_name.get(type_name).copied()
    }

    /// Registers a definition, returning its index and whether it is new.
    ///
    /// A known type name must present an identical shape; anything else is
    /// a [`SchemaError::ShapeConflict`]. New definitions are staged until
    /// the next commit.
    pub fn stage(&mut self, definition: PacketDefinition) -> SchemaResult<(u32, bool)> {
        definition.validate()?;
        if let Some(index) = self.index_of(definition.type_name()) {
            let existing = &self.definitions[index as usize];
            if definition_hash(existing) != definition_hash(&definition) {
                return Err(SchemaError::ShapeConflict {
                    type_name: definition.type_name().to_owned(),
                });
            }
            return Ok((index, false));
        }
        let index = self.definitions.len() as u32;
        self.by_name
            .insert(definition.type_name().to_owned(), index);
        self.definitions.push(Arc::new(definition));
        Ok((index, true))
    }

    /// Makes all staged definitions permanent.
    pub fn commit(&mut self) {
        self.committed_len = self.definitions.len();
    }

    /// Discards staged definitions.
    pub fn rollback(&mut self) {
        for definition in self.definitions.drain(self.committed_len..) {
            self.by_name.remove(definition.type_name());
        }
    }
}
