//! Whole-session-file writing.

use std::io::{Seek, SeekFrom, Write};

use fieldcodec::Timestamp;
use flate2::write::GzEncoder;
use flate2::Compression;
use schema::Packet;
use tracing::{debug, info, warn};
use wire::{FileHeader, SessionHeader, SessionStatus, HEADER_SIZE};

use crate::error::{SessionError, SessionResult};
use crate::options::SessionOptions;
use crate::writer::PacketWriter;

/// Where packet frames go before reaching the file.
#[derive(Debug)]
enum PacketSink {
    /// Protocol 1: frames accumulate in memory and land as one block at
    /// close.
    Buffered(PacketWriter<Vec<u8>>),
    /// Protocol >= 2: frames stream through gzip; compressed bytes are
    /// pushed to the file on every flush.
    Compressed(PacketWriter<GzEncoder<Vec<u8>>>),
}

/// Writes a complete session file: file header, session header, then the
/// packet stream.
///
/// Lifecycle: created -> `write_packet`* -> `flush`* ->
/// `close(is_last_file)`. Flush pushes compressed bytes and rewrites the
/// session header in place so a live file stays readable; close finishes
/// the payload stream and records the terminal status. Dropping an unclosed
/// writer closes it implicitly with `is_last_file = false`, leaving the
/// session marked as still running so readers can tell the end was not
/// clean.
pub struct SessionFileWriter<W: Write + Seek> {
    file: W,
    options: SessionOptions,
    header: SessionHeader,
    header_block_len: usize,
    sink: Option<PacketSink>,
    closed: bool,
}

impl<W: Write + Seek> SessionFileWriter<W> {
    /// Creates the file: writes both headers and prepares the packet sink.
    pub fn new(mut file: W, header: SessionHeader, options: SessionOptions) -> SessionResult<Self> {
        let block = header.encode(options.version)?;
        let file_header = FileHeader::new(options.version, block.len());
        file.write_all(&file_header.encode())?;
        file.write_all(&block)?;

        let sink = if options.version.compresses_payload() {
            PacketSink::Compressed(PacketWriter::with_limits(
                GzEncoder::new(Vec::new(), Compression::default()),
                options.version,
                options.limits,
            ))
        } else {
            PacketSink::Buffered(PacketWriter::with_limits(
                Vec::new(),
                options.version,
                options.limits,
            ))
        };

        info!(
            session_id = %header.session_id,
            version = %options.version,
            "session file created"
        );
        Ok(Self {
            file,
            options,
            header,
            header_block_len: block.len(),
            sink: Some(sink),
            closed: false,
        })
    }

    /// The session header as it will next be written.
    #[must_use]
    pub const fn session_header(&self) -> &SessionHeader {
        &self.header
    }

    /// Mutable access to the session header counters and status.
    ///
    /// Only fixed-width fields may change after creation; altering a string
    /// field changes the header's size and the next flush will fail with
    /// a size-change error rather than corrupt the packet stream.
    pub fn session_header_mut(&mut self) -> &mut SessionHeader {
        &mut self.header
    }

    /// Writes one packet (and its dependencies) to the session stream.
    pub fn write_packet(&mut self, packet: &dyn Packet) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::WriterClosed);
        }
        match self.sink.as_mut() {
            Some(PacketSink::Buffered(writer)) => writer.write(packet)?,
            Some(PacketSink::Compressed(writer)) => writer.write(packet)?,
            None => return Err(SessionError::WriterClosed),
        }
        self.header.message_count = self.header.message_count.saturating_add(1);
        Ok(())
    }

    /// Pushes pending payload bytes and rewrites the session header in
    /// place.
    pub fn flush(&mut self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::WriterClosed);
        }
        let now = Timestamp::now();
        self.header.end_time = now;
        self.header.file_end_time = now;

        if let Some(PacketSink::Compressed(writer)) = self.sink.as_mut() {
            let encoder = writer.get_mut();
            encoder.flush()?;
            let bytes = std::mem::take(encoder.get_mut());
            if !bytes.is_empty() {
                self.file.write_all(&bytes)?;
            }
        }
        self.rewrite_session_header()?;
        self.file.flush()?;
        debug!(session_id = %self.header.session_id, "session file flushed");
        Ok(())
    }

    /// Closes the file, finishing the payload stream and recording the
    /// terminal status. `is_last_file` marks a clean end of the session;
    /// an implicit close (via drop) passes `false`.
    pub fn close(mut self, is_last_file: bool) -> SessionResult<()> {
        self.close_impl(is_last_file)
    }

    fn close_impl(&mut self, is_last_file: bool) -> SessionResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let now = Timestamp::now();
        self.header.end_time = now;
        self.header.file_end_time = now;
        self.header.is_last_file = is_last_file;
        if is_last_file && self.header.status == SessionStatus::Running {
            self.header.status = SessionStatus::Normal;
        }

        match self.sink.take() {
            Some(PacketSink::Buffered(writer)) => {
                let bytes = writer.into_inner();
                if !bytes.is_empty() {
                    self.file.write_all(&bytes)?;
                }
            }
            Some(PacketSink::Compressed(writer)) => {
                let bytes = writer.into_inner().finish()?;
                if !bytes.is_empty() {
                    self.file.write_all(&bytes)?;
                }
            }
            None => {}
        }
        self.rewrite_session_header()?;
        self.file.flush()?;
        info!(
            session_id = %self.header.session_id,
            is_last_file,
            "session file closed"
        );
        Ok(())
    }

    /// Seek to the session header's fixed offset, overwrite it with the
    /// identical byte budget, and restore the position no matter what.
    fn rewrite_session_header(&mut self) -> SessionResult<()> {
        let mut block = vec![0u8; self.header_block_len];
        self.header.encode_into(self.options.version, &mut block)?;

        let position = self.file.stream_position()?;
        let write_result = self
            .file
            .seek(SeekFrom::Start(HEADER_SIZE as u64))
            .map_err(SessionError::from)
            .and_then(|_| self.file.write_all(&block).map_err(SessionError::from));
        let restore_result = self
            .file
            .seek(SeekFrom::Start(position))
            .map(|_| ())
            .map_err(SessionError::from);
        write_result.and(restore_result)
    }
}

impl<W: Write + Seek> Drop for SessionFileWriter<W> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                session_id = %self.header.session_id,
                "session file writer dropped without close"
            );
            if let Err(err) = self.close_impl(false) {
                warn!(error = %err, "implicit session close failed");
            }
        }
    }
}
