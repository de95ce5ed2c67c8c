//! The transactional packet writer.

use std::collections::HashSet;
use std::io::Write;
use std::rc::Rc;

use fieldcodec::{shared_table, FieldWriter, ProtocolVersion, SharedStringTable};
use schema::{Packet, PacketDefinitionList, SchemaError};
use uuid::Uuid;
use wire::WireLimits;

use crate::error::{SessionError, SessionResult};

/// Writes packets onto an output stream with per-stream type caching and
/// atomic commit.
///
/// For each packet: cacheable instances already on the stream are skipped
/// entirely; dependencies are written first (each as its own committed
/// packet, so a definition is never referenced before it exists on the
/// wire); the packet's bytes are built into a scratch buffer and only
/// appended, length-prefixed, once they built cleanly. A failed build rolls
/// back the definition list and string table, leaving the stream and caches
/// exactly as if the write had never been attempted.
#[derive(Debug)]
pub struct PacketWriter<W: Write> {
    out: W,
    version: ProtocolVersion,
    limits: WireLimits,
    definitions: PacketDefinitionList,
    cache: HashSet<Uuid>,
    strings: SharedStringTable,
    bytes_written: u64,
}

impl<W: Write> PacketWriter<W> {
    /// Creates a writer with default limits and a fresh string table.
    pub fn new(out: W, version: ProtocolVersion) -> Self {
        Self::with_limits(out, version, WireLimits::default())
    }

    /// Creates a writer with explicit limits.
    pub fn with_limits(out: W, version: ProtocolVersion, limits: WireLimits) -> Self {
        Self {
            out,
            version,
            limits,
            definitions: PacketDefinitionList::new(),
            cache: HashSet::new(),
            strings: shared_table(),
            bytes_written: 0,
        }
    }

    /// The protocol version being written.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Total frame bytes emitted so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Number of type definitions committed to the stream.
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// The shared string table (for pairing a related writer or reader).
    #[must_use]
    pub fn string_table(&self) -> SharedStringTable {
        Rc::clone(&self.strings)
    }

    /// A reference to the underlying output.
    #[must_use]
    pub const fn get_ref(&self) -> &W {
        &self.out
    }

    /// A mutable reference to the underlying output.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Consumes the writer, returning the underlying output.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes one packet (and, first, anything it depends on).
    ///
    /// Writing a cacheable packet that is already on this stream emits
    /// nothing and succeeds.
    pub fn write(&mut self, packet: &dyn Packet) -> SessionResult<()> {
        if let Some(id) = packet.cache_id() {
            if self.cache.contains(&id) {
                return Ok(());
            }
        }
        for dependency in packet.dependencies() {
            self.write(dependency)?;
        }
        match self.stage_and_emit(packet) {
            Ok(()) => {
                self.definitions.commit();
                self.strings.borrow_mut().commit();
                if let Some(id) = packet.cache_id() {
                    self.cache.insert(id);
                }
                Ok(())
            }
            Err(err) => {
                self.definitions.rollback();
                self.strings.borrow_mut().rollback();
                Err(err)
            }
        }
    }

    fn stage_and_emit(&mut self, packet: &dyn Packet) -> SessionResult<()> {
        let (index, is_new) = match self.definitions.index_of(packet.type_name()) {
            Some(index) => (index, false),
            None => self.definitions.stage(packet.definition())?,
        };
        let definition = self.definitions.get(index).cloned().ok_or(
            SessionError::Schema(SchemaError::UnknownDefinitionIndex {
                index,
                known: self.definitions.len(),
            }),
        )?;

        let mut fields = FieldWriter::new(self.version, Rc::clone(&self.strings));
        fields.write_u32(index);
        if is_new {
            definition.encode(&mut fields)?;
        }
        if definition.is_cacheable() {
            let id = packet
                .cache_id()
                .ok_or_else(|| SessionError::CacheableWithoutId {
                    type_name: definition.type_name().to_owned(),
                })?;
            fields.write_guid(id);
        }
        definition.write_values(&packet.field_values(), &mut fields)?;

        let payload = fields.into_bytes();
        let mut frame = Vec::with_capacity(wire::frame_len(payload.len()));
        wire::write_frame(&payload, &self.limits, &mut frame)?;
        self.out.write_all(&frame)?;
        self.bytes_written += frame.len() as u64;
        Ok(())
    }
}
