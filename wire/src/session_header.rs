//! The variable-length, stable-size session header.

use fieldcodec::{ProtocolVersion, Timestamp};
use uuid::Uuid;

use crate::error::{WireError, WireResult};

/// Terminal and in-progress session states recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SessionStatus {
    /// The session is live (or ended without a clean close).
    Running = 0,
    /// The session closed normally.
    Normal = 1,
    /// The session ended abnormally.
    Crashed = 2,
}

impl SessionStatus {
    /// Parses a status from its wire code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Running),
            1 => Some(Self::Normal),
            2 => Some(Self::Crashed),
            _ => None,
        }
    }
}

/// The session metadata block written immediately after the file header.
///
/// A live session rewrites this block in place as its counters advance, so
/// every mutable field uses a fixed-width encoding and the strings (fixed at
/// session creation) are the only variable-length content. Re-encoding a
/// header for the same session therefore always produces the same byte
/// length; [`encode_into`](Self::encode_into) enforces that.
///
/// Fields gated on protocol major version 2 (computer id, environment,
/// promotion level, and the multi-file fragment block) are absent from the
/// wire on version 1 and decode to their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHeader {
    pub session_id: Uuid,
    pub computer_id: Uuid,
    pub product: String,
    pub application: String,
    pub environment: String,
    pub promotion_level: String,
    pub status: SessionStatus,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub message_count: i32,
    pub critical_count: i32,
    pub error_count: i32,
    pub warning_count: i32,
    pub file_id: Uuid,
    pub file_sequence: i32,
    pub file_start_time: Timestamp,
    pub file_end_time: Timestamp,
    pub is_last_file: bool,
}

impl SessionHeader {
    /// Creates a header for a new session starting now-ish at `start_time`.
    #[must_use]
    pub fn new(
        session_id: Uuid,
        product: impl Into<String>,
        application: impl Into<String>,
        start_time: Timestamp,
    ) -> Self {
        Self {
            session_id,
            computer_id: Uuid::nil(),
            product: product.into(),
            application: application.into(),
            environment: String::new(),
            promotion_level: String::new(),
            status: SessionStatus::Running,
            start_time,
            end_time: start_time,
            message_count: 0,
            critical_count: 0,
            error_count: 0,
            warning_count: 0,
            file_id: Uuid::nil(),
            file_sequence: 0,
            file_start_time: start_time,
            file_end_time: start_time,
            is_last_file: false,
        }
    }

    /// Encodes the whole block: a u32 length prefix, then the body.
    pub fn encode(&self, version: ProtocolVersion) -> WireResult<Vec<u8>> {
        let mut body = Vec::with_capacity(128);
        write_guid(&mut body, self.session_id);
        if version.supports_computer_id() {
            write_guid(&mut body, self.computer_id);
        }
        write_string(&mut body, &self.product)?;
        write_string(&mut body, &self.application)?;
        if version.supports_environment() {
            write_string(&mut body, &self.environment)?;
            write_string(&mut body, &self.promotion_level)?;
        }
        write_u32(&mut body, self.status as u32);
        write_timestamp(&mut body, self.start_time);
        write_timestamp(&mut body, self.end_time);
        write_i32(&mut body, self.message_count);
        write_i32(&mut body, self.critical_count);
        write_i32(&mut body, self.error_count);
        write_i32(&mut body, self.warning_count);
        if version.supports_fragments() {
            write_guid(&mut body, self.file_id);
            write_i32(&mut body, self.file_sequence);
            write_timestamp(&mut body, self.file_start_time);
            write_timestamp(&mut body, self.file_end_time);
            body.push(u8::from(self.is_last_file));
        }

        let mut block = Vec::with_capacity(4 + body.len());
        write_u32(&mut block, body.len() as u32);
        block.extend_from_slice(&body);
        Ok(block)
    }

    /// Re-encodes into an existing byte budget for in-place rewrite.
    ///
    /// The budget must match exactly: the packet stream begins right after
    /// this block, so a size change would corrupt it.
    pub fn encode_into(&self, version: ProtocolVersion, out: &mut [u8]) -> WireResult<()> {
        let block = self.encode(version)?;
        if block.len() != out.len() {
            return Err(WireError::HeaderSizeChanged {
                expected: out.len(),
                actual: block.len(),
            });
        }
        out.copy_from_slice(&block);
        Ok(())
    }

    /// Decodes a block from the start of `buf`, returning the header and
    /// the total bytes consumed (prefix included).
    pub fn decode(buf: &[u8], version: ProtocolVersion) -> WireResult<(Self, usize)> {
        let mut cursor = Cursor::new(buf);
        let body_len = cursor.read_u32()? as usize;
        if body_len > cursor.remaining() {
            return Err(WireError::Truncated {
                needed: body_len,
                available: cursor.remaining(),
            });
        }
        let total = 4 + body_len;
        let mut cursor = Cursor::new(&buf[4..total]);

        let session_id = cursor.read_guid()?;
        let computer_id = if version.supports_computer_id() {
            cursor.read_guid()?
        } else {
            Uuid::nil()
        };
        let product = cursor.read_string()?;
        let application = cursor.read_string()?;
        let (environment, promotion_level) = if version.supports_environment() {
            (cursor.read_string()?, cursor.read_string()?)
        } else {
            (String::new(), String::new())
        };
        let status_code = cursor.read_u32()?;
        let status = SessionStatus::from_code(status_code)
            .ok_or(WireError::UnknownStatus { code: status_code })?;
        let start_time = cursor.read_timestamp()?;
        let end_time = cursor.read_timestamp()?;
        let message_count = cursor.read_i32()?;
        let critical_count = cursor.read_i32()?;
        let error_count = cursor.read_i32()?;
        let warning_count = cursor.read_i32()?;
        let (file_id, file_sequence, file_start_time, file_end_time, is_last_file) =
            if version.supports_fragments() {
                (
                    cursor.read_guid()?,
                    cursor.read_i32()?,
                    cursor.read_timestamp()?,
                    cursor.read_timestamp()?,
                    cursor.read_u8()? != 0,
                )
            } else {
                (Uuid::nil(), 0, start_time, end_time, true)
            };

        Ok((
            Self {
                session_id,
                computer_id,
                product,
                application,
                environment,
                promotion_level,
                status,
                start_time,
                end_time,
                message_count,
                critical_count,
                error_count,
                warning_count,
                file_id,
                file_sequence,
                file_start_time,
                file_end_time,
                is_last_file,
            },
            total,
        ))
    }
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_guid(out: &mut Vec<u8>, value: Uuid) {
    out.extend_from_slice(value.as_bytes());
}

fn write_timestamp(out: &mut Vec<u8>, value: Timestamp) {
    out.extend_from_slice(&value.ticks().to_le_bytes());
    out.extend_from_slice(&value.offset_minutes().to_le_bytes());
}

fn write_string(out: &mut Vec<u8>, value: &str) -> WireResult<()> {
    let length = u32::try_from(value.len()).map_err(|_| WireError::Truncated {
        needed: value.len(),
        available: u32::MAX as usize,
    })?;
    write_u32(out, length);
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, count: usize) -> WireResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(WireError::Truncated {
                needed: count,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn read_u8(&mut self) -> WireResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> WireResult<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_i32(&mut self) -> WireResult<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> WireResult<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_guid(&mut self) -> WireResult<Uuid> {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(self.take(16)?);
        Ok(Uuid::from_bytes(raw))
    }

    fn read_timestamp(&mut self) -> WireResult<Timestamp> {
        let ticks = self.read_i64()?;
        let offset = self.read_i32()?;
        Ok(Timestamp::from_ticks(ticks, offset))
    }

    fn read_string(&mut self) -> WireResult<String> {
        let length = self.read_u32()? as usize;
        let bytes = self.take(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|err| {
            WireError::Field(fieldcodec::FieldError::InvalidUtf8 {
                position: self.pos - length + err.utf8_error().valid_up_to(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionHeader {
        let mut header = SessionHeader::new(
            Uuid::from_u128(0x1111_2222_3333_4444),
            "Loupe",
            "AgentService",
            Timestamp::utc(1_000_000_000),
        );
        header.computer_id = Uuid::from_u128(7);
        header.environment = "production".to_owned();
        header.promotion_level = "release".to_owned();
        header.file_id = Uuid::from_u128(9);
        header
    }

    #[test]
    fn roundtrip_current() {
        let header = sample();
        let bytes = header.encode(ProtocolVersion::CURRENT).unwrap();
        let (decoded, consumed) =
            SessionHeader::decode(&bytes, ProtocolVersion::CURRENT).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, header);
    }

    #[test]
    fn roundtrip_v1_drops_gated_fields() {
        let header = sample();
        let bytes = header.encode(ProtocolVersion::V1).unwrap();
        let (decoded, _) = SessionHeader::decode(&bytes, ProtocolVersion::V1).unwrap();
        assert_eq!(decoded.session_id, header.session_id);
        assert_eq!(decoded.product, header.product);
        assert_eq!(decoded.computer_id, Uuid::nil());
        assert_eq!(decoded.environment, "");
        assert!(decoded.is_last_file);
    }

    #[test]
    fn v1_encoding_is_shorter() {
        let header = sample();
        let v1 = header.encode(ProtocolVersion::V1).unwrap();
        let v2 = header.encode(ProtocolVersion::CURRENT).unwrap();
        assert!(v1.len() < v2.len());
    }

    #[test]
    fn size_is_stable_across_counter_changes() {
        let mut header = sample();
        let original = header.encode(ProtocolVersion::CURRENT).unwrap();

        header.message_count = i32::MAX;
        header.error_count = 123_456;
        header.status = SessionStatus::Normal;
        header.end_time = Timestamp::utc(i64::MAX / 2);
        header.is_last_file = true;
        let updated = header.encode(ProtocolVersion::CURRENT).unwrap();
        assert_eq!(original.len(), updated.len());
    }

    #[test]
    fn encode_into_rejects_size_change() {
        let header = sample();
        let mut budget = header.encode(ProtocolVersion::CURRENT).unwrap();

        let mut changed = header.clone();
        changed.product = "DifferentProductName".to_owned();
        assert!(matches!(
            changed.encode_into(ProtocolVersion::CURRENT, &mut budget),
            Err(WireError::HeaderSizeChanged { .. })
        ));
    }

    #[test]
    fn encode_into_same_session_succeeds() {
        let header = sample();
        let mut budget = header.encode(ProtocolVersion::CURRENT).unwrap();

        let mut updated = header.clone();
        updated.message_count = 42;
        updated.status = SessionStatus::Crashed;
        updated.encode_into(ProtocolVersion::CURRENT, &mut budget).unwrap();

        let (decoded, _) = SessionHeader::decode(&budget, ProtocolVersion::CURRENT).unwrap();
        assert_eq!(decoded.message_count, 42);
        assert_eq!(decoded.status, SessionStatus::Crashed);
    }

    #[test]
    fn decode_rejects_truncated_body() {
        let header = sample();
        let bytes = header.encode(ProtocolVersion::CURRENT).unwrap();
        assert!(matches!(
            SessionHeader::decode(&bytes[..bytes.len() - 4], ProtocolVersion::CURRENT),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn decode_rejects_unknown_status() {
        let header = sample();
        let mut bytes = header.encode(ProtocolVersion::CURRENT).unwrap();
        // status sits after the length prefix, two guids, and four strings
        let strings_len: usize = [
            header.product.len(),
            header.application.len(),
            header.environment.len(),
            header.promotion_level.len(),
        ]
        .iter()
        .map(|len| 4 + len)
        .sum();
        let status_at = 4 + 16 + 16 + strings_len;
        bytes[status_at..status_at + 4].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            SessionHeader::decode(&bytes, ProtocolVersion::CURRENT),
            Err(WireError::UnknownStatus { code: 99 })
        ));
    }
}
