//! Packet stream orchestration and session file read/write for the GLF
//! format.
//!
//! This is the top layer of the codec: it ties the field codec, the schema
//! layer, and the wire framing together.
//!
//! - [`PacketWriter`] / [`PacketReader`] - transactional packet streams
//!   with per-stream definition caching and write-once cacheable packets
//! - [`RecordPacket`] - dynamically typed records on the read side
//! - [`SessionFileWriter`] / [`SessionFileReader`] - complete session
//!   files: fixed file header, size-stable session header, then the
//!   (optionally gzip-compressed) packet stream
//!
//! # Design Principles
//!
//! - **Atomic packet writes** - a packet either lands whole, with its
//!   definition, or not at all; shared caches roll back with it.
//! - **Definitions before use** - dependency packets and type definitions
//!   always precede anything that references them.
//! - **Readable while live** - the session header rewrites in place with a
//!   stable size, and flush makes compressed bytes visible.

mod error;
mod file_reader;
mod file_writer;
mod options;
mod reader;
mod record;
mod writer;

pub use error::{SessionError, SessionResult};
pub use file_reader::SessionFileReader;
pub use file_writer::SessionFileWriter;
pub use options::SessionOptions;
pub use reader::PacketReader;
pub use record::RecordPacket;
pub use writer::PacketWriter;

pub use fieldcodec::{Duration, ProtocolVersion, Timestamp};
pub use schema::{FieldType, FieldValue, Packet, PacketDefinition};
pub use wire::{SessionHeader, SessionStatus, WireLimits};
