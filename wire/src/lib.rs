//! Packet framing and file/session headers for the GLF session format.
//!
//! Three concerns live here, all below the packet layer and above raw
//! bytes:
//!
//! - **Framing** - every packet travels as a varint length prefix followed
//!   by its payload ([`write_frame`]).
//! - **Reassembly** - [`PacketBuffer`] turns a sequence of fixed-size
//!   chunks back into whole packets, reporting the two partial cases
//!   (payload short, prefix cut) as explicit [`ReadAttempt`] states rather
//!   than errors.
//! - **Headers** - the fixed 20-byte [`FileHeader`] and the variable but
//!   size-stable [`SessionHeader`] that precede the packet stream on disk.

mod buffer;
mod error;
mod file_header;
mod framing;
mod limits;
mod session_header;

pub use buffer::{PacketBuffer, ReadAttempt};
pub use error::{WireError, WireResult};
pub use file_header::{FileHeader, HEADER_SIZE, MAGIC};
pub use framing::{frame_len, write_frame};
pub use limits::{WireLimits, BUFFER_INCREMENT, DEFAULT_BUFFER_SIZE};
pub use session_header::{SessionHeader, SessionStatus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = PacketBuffer::new();
        let _ = WireLimits::default();
        let _: WireResult<()> = Ok(());
        assert_eq!(HEADER_SIZE, 20);
        assert_eq!(MAGIC.len(), 8);
        assert_eq!(DEFAULT_BUFFER_SIZE, 131_072);
    }

    #[test]
    fn header_offset_matches_frame_math() {
        use fieldcodec::{ProtocolVersion, Timestamp};
        let header = SessionHeader::new(
            uuid::Uuid::nil(),
            "p",
            "a",
            Timestamp::utc(0),
        );
        let block = header.encode(ProtocolVersion::CURRENT).unwrap();
        let file_header = FileHeader::new(ProtocolVersion::CURRENT, block.len());
        assert_eq!(file_header.data_offset as usize, HEADER_SIZE + block.len());
    }
}
