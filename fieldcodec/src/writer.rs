//! Field-level value encoder.

use uuid::Uuid;

use crate::error::{FieldError, FieldResult};
use crate::strings::SharedStringTable;
use crate::time::{
    Duration, Timestamp, TimestampTag, DELTA_UNITS, TICKS_PER_DAY, TICKS_PER_SECOND,
};
use crate::version::ProtocolVersion;

/// Encodes typed values into a compact byte buffer.
///
/// The writer appends to an internal buffer; the caller takes the bytes with
/// [`into_bytes`](Self::into_bytes) once a unit of work (typically one
/// packet) is complete. String and timestamp encodings consult the shared
/// string table, so writers that must stay positionally synchronized with a
/// reader are constructed over the same table handle.
#[derive(Debug)]
pub struct FieldWriter {
    buffer: Vec<u8>,
    version: ProtocolVersion,
    strings: SharedStringTable,
    preferred_factor: Option<u64>,
}

impl FieldWriter {
    /// Creates a writer for the given protocol version and shared table.
    #[must_use]
    pub fn new(version: ProtocolVersion, strings: SharedStringTable) -> Self {
        Self {
            buffer: Vec::new(),
            version,
            strings,
            preferred_factor: None,
        }
    }

    /// Creates a writer with a pre-allocated buffer.
    #[must_use]
    pub fn with_capacity(version: ProtocolVersion, strings: SharedStringTable, bytes: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(bytes),
            version,
            strings,
            preferred_factor: None,
        }
    }

    /// The protocol version this writer encodes for.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer, returning the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Configures a generic timestamp factor. The next timestamp write emits
    /// a `SetFactor` prefix if the stream's factor differs.
    pub fn set_preferred_factor(&mut self, factor: u64) {
        self.preferred_factor = if factor == 0 { None } else { Some(factor) };
    }

    /// Writes a raw byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a boolean as a single 0/1 byte.
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    /// Writes an unsigned 32-bit varint (LEB128, at most 5 bytes).
    pub fn write_u32(&mut self, value: u32) {
        let mut v = value;
        loop {
            let mut byte = (v & 0x7F) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buffer.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    /// Writes an unsigned 64-bit varint.
    ///
    /// The first 8 bytes carry 7 bits each; if bits remain past 56, a 9th
    /// byte carries the top 8 bits in full with no continuation flag.
    pub fn write_u64(&mut self, value: u64) {
        let mut v = value;
        for _ in 0..8 {
            let byte = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                self.buffer.push(byte);
                return;
            }
            self.buffer.push(byte | 0x80);
        }
        // 56 bits consumed; the remainder fits the final full byte.
        self.buffer.push(v as u8);
    }

    /// Writes a signed 32-bit value as sign-and-magnitude varint.
    pub fn write_i32(&mut self, value: i32) {
        let negative = value < 0;
        let magnitude = u64::from(value.unsigned_abs());
        self.write_signed_magnitude(magnitude, negative);
    }

    /// Writes a signed 64-bit value as sign-and-magnitude varint.
    ///
    /// Sign and magnitude are separate on the wire (bit 7 of the first byte
    /// is the sign, bit 6 continuation, bits 0-5 value), so this is not
    /// zig-zag and negative zero cannot occur.
    pub fn write_i64(&mut self, value: i64) {
        let negative = value < 0;
        self.write_signed_magnitude(value.unsigned_abs(), negative);
    }

    fn write_signed_magnitude(&mut self, magnitude: u64, negative: bool) {
        let mut first = (magnitude & 0x3F) as u8;
        let mut rest = magnitude >> 6;
        if negative {
            first |= 0x80;
        }
        if rest != 0 {
            first |= 0x40;
        }
        self.buffer.push(first);
        while rest != 0 {
            let mut byte = (rest & 0x7F) as u8;
            rest >>= 7;
            if rest != 0 {
                byte |= 0x80;
            }
            self.buffer.push(byte);
        }
    }

    /// Writes a double by walking its bit pattern from the high-order end.
    ///
    /// Round decimal values have long runs of trailing zero mantissa bits,
    /// so emitting the top bits first lets the encoding stop early: 1.0
    /// takes two bytes, 0.0 takes one.
    pub fn write_f64(&mut self, value: f64) {
        let bits = value.to_bits();
        for i in 0..8 {
            let shift = 57 - 7 * i;
            let group = ((bits >> shift) & 0x7F) as u8;
            if bits & ((1u64 << shift) - 1) == 0 {
                self.buffer.push(group);
                return;
            }
            self.buffer.push(group | 0x80);
        }
        self.buffer.push((bits & 0xFF) as u8);
    }

    /// Writes a GUID as 16 raw bytes.
    pub fn write_guid(&mut self, value: Uuid) {
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Writes a duration as a signed tick varint.
    pub fn write_duration(&mut self, value: Duration) {
        self.write_i64(value.ticks());
    }

    /// Writes a string, with `None` encoding the distinguished null string.
    ///
    /// Protocol 1 goes through the shared string table: a new string is
    /// written as token 0 plus its literal and added to the table, a known
    /// one as its bare token. Later protocols encode the literal directly.
    pub fn write_string(&mut self, value: Option<&str>) -> FieldResult<()> {
        if !self.version.uses_string_table() {
            return self.write_direct_string(value);
        }
        match value {
            // Null never enters the table; it is re-encoded literally.
            None => {
                self.write_u32(0);
                self.write_direct_string(None)
            }
            Some(text) => {
                let (token, is_new) = self.strings.borrow_mut().intern(text);
                if is_new {
                    self.write_u32(0);
                    self.write_direct_string(Some(text))
                } else {
                    self.write_u32(token);
                    Ok(())
                }
            }
        }
    }

    fn write_direct_string(&mut self, value: Option<&str>) -> FieldResult<()> {
        match value {
            None => {
                // Reserved null encoding: length 1, single NUL byte.
                self.write_u32(1);
                self.buffer.push(0);
                Ok(())
            }
            Some(text) => {
                let bytes = text.as_bytes();
                let length = u32::try_from(bytes.len()).map_err(|_| {
                    FieldError::LengthOutOfRange {
                        length: bytes.len() as u64,
                        available: u32::MAX as usize,
                    }
                })?;
                self.write_u32(length);
                self.buffer.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    /// Writes a timestamp: zone offset, then a tagged delta or absolute
    /// encoding against the shared reference time.
    pub fn write_timestamp(&mut self, value: Timestamp) {
        self.write_i32(value.offset_minutes());
        let ticks = value.ticks();

        let reference = self.strings.borrow().reference_ticks();
        let Some(reference) = reference else {
            self.write_u8(TimestampTag::NewReference as u8);
            self.write_u64(ticks as u64);
            self.strings.borrow_mut().set_reference_ticks(ticks);
            return;
        };

        if let Some(preferred) = self.preferred_factor {
            if self.strings.borrow().factor() != Some(preferred) {
                self.write_u8(TimestampTag::SetFactor as u8);
                self.write_u64(preferred);
                self.strings.borrow_mut().set_factor(preferred);
            }
        }

        let Some(mut delta) = ticks.checked_sub(reference) else {
            self.write_u8(TimestampTag::RawTicks as u8);
            self.write_u64(ticks as u64);
            return;
        };

        // A large delta would defeat the varint compression; move the
        // reference up to the new neighborhood first.
        if delta.unsigned_abs() >= TICKS_PER_DAY as u64 {
            let new_reference = ticks - ticks.rem_euclid(TICKS_PER_SECOND);
            self.write_u8(TimestampTag::SetReference as u8);
            self.write_u64(new_reference as u64);
            self.strings.borrow_mut().set_reference_ticks(new_reference);
            delta = ticks - new_reference;
        }

        let magnitude = delta.unsigned_abs();
        let later = delta >= 0;

        let factor = self.strings.borrow().factor();
        if let Some(factor) = factor {
            if magnitude % factor == 0 {
                let tag = if later {
                    TimestampTag::LaterFactor
                } else {
                    TimestampTag::EarlierFactor
                };
                self.write_u8(tag as u8);
                self.write_u64(magnitude / factor);
                return;
            }
        }

        for (later_tag, earlier_tag, unit) in DELTA_UNITS {
            let unit = unit as u64;
            if magnitude % unit == 0 {
                let tag = if later { later_tag } else { earlier_tag };
                self.write_u8(tag as u8);
                self.write_u64(magnitude / unit);
                return;
            }
        }

        // Sub-microsecond residue: no unit divides, fall back to absolute.
        self.write_u8(TimestampTag::RawTicks as u8);
        self.write_u64(ticks as u64);
    }

    fn write_count(&mut self, count: usize) -> FieldResult<()> {
        let count = u32::try_from(count).map_err(|_| FieldError::LengthOutOfRange {
            length: count as u64,
            available: u32::MAX as usize,
        })?;
        self.write_u32(count);
        Ok(())
    }

    /// Writes a bool array bit-packed 32 to an i32 word, most significant
    /// bit first, prefixed by the true bit count.
    pub fn write_bool_array(&mut self, values: &[bool]) -> FieldResult<()> {
        self.write_count(values.len())?;
        let words: Vec<i32> = values
            .chunks(32)
            .map(|chunk| {
                let mut word = 0u32;
                for (bit, &value) in chunk.iter().enumerate() {
                    if value {
                        word |= 1 << (31 - bit);
                    }
                }
                word as i32
            })
            .collect();
        self.write_i32_array(&words)
    }

    /// Writes an array of strings.
    pub fn write_string_array(&mut self, values: &[Option<String>]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for value in values {
            self.write_string(value.as_deref())?;
        }
        Ok(())
    }

    /// Writes an array of signed 32-bit values.
    pub fn write_i32_array(&mut self, values: &[i32]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for &value in values {
            self.write_i32(value);
        }
        Ok(())
    }

    /// Writes an array of signed 64-bit values.
    pub fn write_i64_array(&mut self, values: &[i64]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for &value in values {
            self.write_i64(value);
        }
        Ok(())
    }

    /// Writes an array of unsigned 32-bit values.
    pub fn write_u32_array(&mut self, values: &[u32]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for &value in values {
            self.write_u32(value);
        }
        Ok(())
    }

    /// Writes an array of unsigned 64-bit values.
    pub fn write_u64_array(&mut self, values: &[u64]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for &value in values {
            self.write_u64(value);
        }
        Ok(())
    }

    /// Writes an array of doubles.
    pub fn write_f64_array(&mut self, values: &[f64]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for &value in values {
            self.write_f64(value);
        }
        Ok(())
    }

    /// Writes an array of durations.
    pub fn write_duration_array(&mut self, values: &[Duration]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for &value in values {
            self.write_duration(value);
        }
        Ok(())
    }

    /// Writes an array of timestamps.
    pub fn write_timestamp_array(&mut self, values: &[Timestamp]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for &value in values {
            self.write_timestamp(value);
        }
        Ok(())
    }

    /// Writes an array of GUIDs.
    pub fn write_guid_array(&mut self, values: &[Uuid]) -> FieldResult<()> {
        self.write_count(values.len())?;
        for &value in values {
            self.write_guid(value);
        }
        Ok(())
    }
}
