//! Whole-session-file reading.

use std::io::Read;

use flate2::read::GzDecoder;
use tracing::debug;
use uuid::Uuid;
use wire::{FileHeader, PacketBuffer, ReadAttempt, SessionHeader, WireError, WireLimits, HEADER_SIZE};

use crate::error::{SessionError, SessionResult};
use crate::options::SessionOptions;
use crate::reader::PacketReader;
use crate::record::RecordPacket;

/// Upper bound on a plausible session header block.
const MAX_SESSION_HEADER_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
enum PayloadSource<R: Read> {
    Plain(R),
    Compressed(GzDecoder<R>),
}

impl<R: Read> Read for PayloadSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(source) => source.read(buf),
            Self::Compressed(source) => source.read(buf),
        }
    }
}

/// Reads a complete session file: validates the headers, then streams
/// records out of the (possibly gzip-wrapped) packet stream in fixed-size
/// chunks.
///
/// A corrupt file fails at open or at the damaged record with a structured
/// error; it never silently yields truncated records.
#[derive(Debug)]
pub struct SessionFileReader<R: Read> {
    source: PayloadSource<R>,
    file_header: FileHeader,
    session_header: SessionHeader,
    buffer: PacketBuffer,
    packets: PacketReader,
    limits: WireLimits,
    chunk: Vec<u8>,
    finished: bool,
}

impl<R: Read> SessionFileReader<R> {
    /// Opens a session stream: reads and validates both headers and
    /// positions at the packet data.
    pub fn open(mut source: R, options: SessionOptions) -> SessionResult<Self> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        source.read_exact(&mut header_bytes)?;
        let file_header = FileHeader::decode(&header_bytes)?;
        let version = file_header.version;

        let mut len_bytes = [0u8; 4];
        source.read_exact(&mut len_bytes)?;
        let body_len = u32::from_le_bytes(len_bytes) as usize;
        if body_len > MAX_SESSION_HEADER_BYTES {
            return Err(WireError::PacketTooLarge {
                length: body_len,
                limit: MAX_SESSION_HEADER_BYTES,
            }
            .into());
        }
        let mut block = vec![0u8; 4 + body_len];
        block[..4].copy_from_slice(&len_bytes);
        source.read_exact(&mut block[4..])?;
        let (session_header, consumed) = SessionHeader::decode(&block, version)?;

        let expected_offset = (HEADER_SIZE + consumed) as u64;
        if u64::from(file_header.data_offset) != expected_offset {
            return Err(WireError::InvalidDataOffset {
                offset: file_header.data_offset,
                expected: expected_offset,
            }
            .into());
        }

        let source = if version.compresses_payload() {
            PayloadSource::Compressed(GzDecoder::new(source))
        } else {
            PayloadSource::Plain(source)
        };

        debug!(
            session_id = %session_header.session_id,
            version = %version,
            "session file opened"
        );
        Ok(Self {
            source,
            file_header,
            session_header,
            buffer: PacketBuffer::new(),
            packets: PacketReader::new(version),
            limits: options.limits,
            chunk: vec![0u8; options.buffer_size.max(16)],
            finished: false,
        })
    }

    /// The validated file header.
    #[must_use]
    pub const fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// The session header as read from the file.
    #[must_use]
    pub const fn session_header(&self) -> &SessionHeader {
        &self.session_header
    }

    /// Looks up a previously read cacheable packet by identity.
    #[must_use]
    pub fn cached(&self, id: &Uuid) -> Option<&RecordPacket> {
        self.packets.cached(id)
    }

    /// Reads the next record, or `None` at a clean end of stream.
    pub fn next_record(&mut self) -> SessionResult<Option<RecordPacket>> {
        loop {
            match self.buffer.next_packet(&self.limits)? {
                ReadAttempt::Complete { start, len } => {
                    let record = self.packets.read_packet(self.buffer.bytes(start, len))?;
                    return Ok(Some(record));
                }
                ReadAttempt::NeedMoreData { .. } | ReadAttempt::NeedMoreForLength => {
                    if self.finished {
                        if self.buffer.is_drained() {
                            return Ok(None);
                        }
                        return Err(SessionError::TruncatedStream {
                            pending: self.buffer.pending(),
                        });
                    }
                    let read = self.source.read(&mut self.chunk)?;
                    if read == 0 {
                        self.finished = true;
                    } else {
                        self.buffer.append(&self.chunk[..read]);
                    }
                }
            }
        }
    }

    /// Reads every remaining record.
    pub fn read_all(&mut self) -> SessionResult<Vec<RecordPacket>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }
}
