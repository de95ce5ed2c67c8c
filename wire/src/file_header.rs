//! The fixed 20-byte file header.

use fieldcodec::ProtocolVersion;

use crate::error::{WireError, WireResult};

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 20;

/// Magic type code identifying a GLF session file.
pub const MAGIC: [u8; 8] = *b"GLFSESSN";

/// The fixed header at offset 0 of every session file.
///
/// Layout: 8 magic bytes, major version (i16), minor version (i16), data
/// offset (i32), data checksum (i32). The data offset is where the packet
/// stream begins: header size plus the session header's byte length. The
/// checksum field is reserved; it is written as zero and ignored on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: ProtocolVersion,
    pub data_offset: u32,
    pub checksum: u32,
}

impl FileHeader {
    /// Creates a header whose data offset accounts for a session header of
    /// `session_header_len` bytes.
    #[must_use]
    pub fn new(version: ProtocolVersion, session_header_len: usize) -> Self {
        Self {
            version,
            data_offset: (HEADER_SIZE + session_header_len) as u32,
            checksum: 0,
        }
    }

    /// Encodes the header into its fixed 20-byte form.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..8].copy_from_slice(&MAGIC);
        out[8..10].copy_from_slice(&(self.version.major() as i16).to_le_bytes());
        out[10..12].copy_from_slice(&(self.version.minor() as i16).to_le_bytes());
        out[12..16].copy_from_slice(&(self.data_offset as i32).to_le_bytes());
        out[16..20].copy_from_slice(&(self.checksum as i32).to_le_bytes());
        out
    }

    /// Decodes and validates a header from the start of `buf`.
    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::HeaderTooSmall {
                actual: buf.len(),
                required: HEADER_SIZE,
            });
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&buf[0..8]);
        if magic != MAGIC {
            return Err(WireError::InvalidMagic { found: magic });
        }

        let major = i16::from_le_bytes(buf[8..10].try_into().unwrap());
        let minor = i16::from_le_bytes(buf[10..12].try_into().unwrap());
        if major < 1 || major > ProtocolVersion::CURRENT.major() as i16 || minor < 0 {
            return Err(WireError::UnsupportedVersion {
                major: major as u16,
                minor: minor as u16,
            });
        }

        let data_offset = i32::from_le_bytes(buf[12..16].try_into().unwrap());
        if data_offset < HEADER_SIZE as i32 {
            return Err(WireError::InvalidDataOffset {
                offset: data_offset as u32,
                expected: HEADER_SIZE as u64,
            });
        }
        let checksum = i32::from_le_bytes(buf[16..20].try_into().unwrap());

        Ok(Self {
            version: ProtocolVersion::new(major as u16, minor as u16),
            data_offset: data_offset as u32,
            checksum: checksum as u32,
        })
    }
}
