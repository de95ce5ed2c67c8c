//! Field-level value encoding for the GLF session format.
//!
//! This crate provides [`FieldWriter`] and [`FieldReader`] for encoding and
//! decoding the primitive values that make up packet fields:
//!
//! - Variable-length integers (7-bit groups, with a 9-byte cap for `u64`)
//! - Sign-and-magnitude signed varints (not zig-zag)
//! - High-bits-first compressed doubles
//! - Strings, directly encoded or interned through a shared table
//! - Delta-compressed timestamps against a rolling reference time
//! - GUIDs and one-dimensional arrays of every scalar type
//!
//! # Design Principles
//!
//! - **Bounded operations** - All reads are bounds-checked; malformed input
//!   returns structured errors, never panics.
//! - **Truncation vs corruption** - Running out of bytes and reading invalid
//!   bytes are distinct error classes.
//! - **Shared positional state** - The string table and timestamp reference
//!   are shared by handle between a writer and its matching reader, never
//!   copied.
//! - **No knowledge of packets** - Framing and schemas live in the layers
//!   above.

mod error;
mod reader;
mod strings;
mod time;
mod version;
mod writer;

pub use error::{FieldError, FieldResult};
pub use reader::FieldReader;
pub use strings::{shared_table, SharedStringTable, UniqueStringTable};
pub use time::{
    Duration, Timestamp, TimestampTag, TICKS_PER_DAY, TICKS_PER_HOUR, TICKS_PER_MICROSECOND,
    TICKS_PER_MILLISECOND, TICKS_PER_MINUTE, TICKS_PER_SECOND, UNIX_EPOCH_TICKS,
};
pub use version::ProtocolVersion;
pub use writer::FieldWriter;
