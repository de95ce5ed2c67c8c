//! Field-level value decoder.

use uuid::Uuid;

use crate::error::{FieldError, FieldResult};
use crate::strings::SharedStringTable;
use crate::time::{delta_unit, Duration, Timestamp, TimestampTag};
use crate::version::ProtocolVersion;

/// Decodes typed values from a byte slice.
///
/// Every read is bounds-checked; running out of bytes yields
/// [`FieldError::UnexpectedEnd`] while structurally invalid bytes yield the
/// corruption variants. The reader never panics on malformed input.
#[derive(Debug)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    position: usize,
    version: ProtocolVersion,
    strings: SharedStringTable,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader over `data` for the given protocol version.
    #[must_use]
    pub fn new(data: &'a [u8], version: ProtocolVersion, strings: SharedStringTable) -> Self {
        Self {
            data,
            position: 0,
            version,
            strings,
        }
    }

    /// The protocol version this reader decodes.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Current byte position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns `true` if all bytes have been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, count: usize) -> FieldResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(FieldError::UnexpectedEnd {
                requested: count,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    /// Reads a raw byte.
    pub fn read_u8(&mut self) -> FieldResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a boolean byte (strictly 0 or 1).
    pub fn read_bool(&mut self) -> FieldResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(FieldError::InvalidBool { value }),
        }
    }

    /// Reads an unsigned 32-bit varint (at most 5 bytes).
    pub fn read_u32(&mut self) -> FieldResult<u32> {
        let mut value = 0u32;
        for i in 0..5 {
            let byte = self.read_u8()?;
            if i == 4 && byte & 0xF0 != 0 {
                return Err(FieldError::InvalidVarint { max_bytes: 5 });
            }
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(FieldError::InvalidVarint { max_bytes: 5 })
    }

    /// Reads an unsigned 64-bit varint (at most 9 bytes; the 9th byte, when
    /// present, carries the top 8 bits in full).
    pub fn read_u64(&mut self) -> FieldResult<u64> {
        let mut value = 0u64;
        for i in 0..8 {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        let byte = self.read_u8()?;
        Ok(value | u64::from(byte) << 56)
    }

    /// Reads a signed 32-bit sign-and-magnitude varint.
    pub fn read_i32(&mut self) -> FieldResult<i32> {
        let first = self.read_u8()?;
        let negative = first & 0x80 != 0;
        let mut magnitude = u32::from(first & 0x3F);
        if first & 0x40 != 0 {
            let mut shift = 6u32;
            loop {
                if shift > 27 {
                    return Err(FieldError::InvalidVarint { max_bytes: 5 });
                }
                let byte = self.read_u8()?;
                let bits = u32::from(byte & 0x7F);
                if shift + 7 > 32 && bits >> (32 - shift) != 0 {
                    return Err(FieldError::InvalidVarint { max_bytes: 5 });
                }
                magnitude |= bits << shift;
                if byte & 0x80 == 0 {
                    break;
                }
                shift += 7;
            }
        }
        if negative {
            if magnitude > 1 << 31 {
                return Err(FieldError::SignedOverflow {
                    magnitude: u64::from(magnitude),
                    negative,
                });
            }
            Ok((magnitude as i32).wrapping_neg())
        } else {
            i32::try_from(magnitude).map_err(|_| FieldError::SignedOverflow {
                magnitude: u64::from(magnitude),
                negative,
            })
        }
    }

    /// Reads a signed 64-bit sign-and-magnitude varint.
    pub fn read_i64(&mut self) -> FieldResult<i64> {
        let first = self.read_u8()?;
        let negative = first & 0x80 != 0;
        let mut magnitude = u64::from(first & 0x3F);
        if first & 0x40 != 0 {
            let mut shift = 6u32;
            loop {
                if shift > 62 {
                    return Err(FieldError::InvalidVarint { max_bytes: 10 });
                }
                let byte = self.read_u8()?;
                let bits = u64::from(byte & 0x7F);
                if shift + 7 > 64 && bits >> (64 - shift) != 0 {
                    return Err(FieldError::InvalidVarint { max_bytes: 10 });
                }
                magnitude |= bits << shift;
                if byte & 0x80 == 0 {
                    break;
                }
                shift += 7;
            }
        }
        if negative {
            if magnitude > 1 << 63 {
                return Err(FieldError::SignedOverflow {
                    magnitude,
                    negative,
                });
            }
            Ok((magnitude as i64).wrapping_neg())
        } else {
            i64::try_from(magnitude).map_err(|_| FieldError::SignedOverflow {
                magnitude,
                negative,
            })
        }
    }

    /// Reads a high-bits-first compressed double.
    pub fn read_f64(&mut self) -> FieldResult<f64> {
        let mut accumulator = 0u64;
        for count in 1..=8u32 {
            let byte = self.read_u8()?;
            accumulator = (accumulator << 7) | u64::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(f64::from_bits(accumulator << (64 - 7 * count)));
            }
        }
        let byte = self.read_u8()?;
        Ok(f64::from_bits((accumulator << 8) | u64::from(byte)))
    }

    /// Reads a GUID from 16 raw bytes.
    pub fn read_guid(&mut self) -> FieldResult<Uuid> {
        let bytes = self.take(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Uuid::from_bytes(raw))
    }

    /// Reads a duration from a signed tick varint.
    pub fn read_duration(&mut self) -> FieldResult<Duration> {
        Ok(Duration::from_ticks(self.read_i64()?))
    }

    fn read_direct_string(&mut self) -> FieldResult<Option<String>> {
        let length = self.read_u32()? as usize;
        if length > self.remaining() {
            return Err(FieldError::LengthOutOfRange {
                length: length as u64,
                available: self.remaining(),
            });
        }
        if length == 1 && self.data[self.position] == 0 {
            // Reserved null encoding.
            self.position += 1;
            return Ok(None);
        }
        let start = self.position;
        let bytes = self.take(length)?;
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(Some(text.to_owned())),
            Err(err) => Err(FieldError::InvalidUtf8 {
                position: start + err.valid_up_to(),
            }),
        }
    }

    /// Reads a string, returning `None` for the distinguished null string.
    ///
    /// Protocol 1 resolves through the shared string table, replaying the
    /// writer's insertions. Token 0 introduces a literal; any other token
    /// references an existing entry.
    pub fn read_string(&mut self) -> FieldResult<Option<String>> {
        if !self.version.uses_string_table() {
            return self.read_direct_string();
        }
        let token = self.read_u32()?;
        if token == 0 {
            let literal = self.read_direct_string()?;
            if let Some(text) = &literal {
                self.strings.borrow_mut().intern(text);
            }
            return Ok(literal);
        }
        let entry = {
            let table = self.strings.borrow();
            let known = table.len();
            table
                .get(token)
                .map(str::to_owned)
                .ok_or(FieldError::UnknownStringToken { token, known })?
        };
        // Legacy protocol-1 writers raced on the table and could re-emit a
        // literal even though its token already existed; consume the
        // duplicate when it is sitting right here, otherwise rewind.
        let saved = self.position;
        match self.read_direct_string() {
            Ok(Some(duplicate)) if duplicate == entry => {}
            _ => self.position = saved,
        }
        Ok(Some(entry))
    }

    /// Reads a timestamp: zone offset, then tagged encodings until a
    /// terminating tag resolves the instant.
    pub fn read_timestamp(&mut self) -> FieldResult<Timestamp> {
        let offset_minutes = self.read_i32()?;
        loop {
            let raw = self.read_u8()?;
            let tag = TimestampTag::from_raw(raw)
                .ok_or(FieldError::UnknownTimestampTag { tag: raw })?;
            match tag {
                TimestampTag::RawTicks => {
                    let ticks = self.read_u64()? as i64;
                    return Ok(Timestamp::from_ticks(ticks, offset_minutes));
                }
                TimestampTag::NewReference => {
                    let ticks = self.read_u64()? as i64;
                    self.strings.borrow_mut().set_reference_ticks(ticks);
                    return Ok(Timestamp::from_ticks(ticks, offset_minutes));
                }
                TimestampTag::SetReference => {
                    let ticks = self.read_u64()? as i64;
                    self.strings.borrow_mut().set_reference_ticks(ticks);
                }
                TimestampTag::SetFactor => {
                    let factor = self.read_u64()?;
                    self.strings.borrow_mut().set_factor(factor);
                }
                TimestampTag::LaterFactor | TimestampTag::EarlierFactor => {
                    let count = self.read_u64()?;
                    let factor = {
                        self.strings
                            .borrow()
                            .factor()
                            .ok_or(FieldError::MissingTimeFactor)?
                    };
                    let reference = self.reference_ticks()?;
                    let magnitude =
                        count
                            .checked_mul(factor)
                            .ok_or(FieldError::TickOverflow {
                                reference,
                                delta: count,
                            })?;
                    let later = tag == TimestampTag::LaterFactor;
                    return self.resolve_delta(reference, magnitude, later, offset_minutes);
                }
                delta_tag => {
                    let count = self.read_u64()?;
                    let (unit, later) = delta_unit(delta_tag)
                        .ok_or(FieldError::UnknownTimestampTag { tag: raw })?;
                    let reference = self.reference_ticks()?;
                    let magnitude =
                        count
                            .checked_mul(unit as u64)
                            .ok_or(FieldError::TickOverflow {
                                reference,
                                delta: count,
                            })?;
                    return self.resolve_delta(reference, magnitude, later, offset_minutes);
                }
            }
        }
    }

    fn reference_ticks(&self) -> FieldResult<i64> {
        self.strings
            .borrow()
            .reference_ticks()
            .ok_or(FieldError::MissingTimeReference)
    }

    fn resolve_delta(
        &self,
        reference: i64,
        magnitude: u64,
        later: bool,
        offset_minutes: i32,
    ) -> FieldResult<Timestamp> {
        let ticks = if later {
            reference.checked_add_unsigned(magnitude)
        } else {
            reference.checked_sub_unsigned(magnitude)
        }
        .ok_or(FieldError::TickOverflow {
            reference,
            delta: magnitude,
        })?;
        Ok(Timestamp::from_ticks(ticks, offset_minutes))
    }

    fn read_count(&mut self, min_element_bytes: usize) -> FieldResult<usize> {
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_element_bytes) > self.remaining() {
            return Err(FieldError::LengthOutOfRange {
                length: count as u64,
                available: self.remaining(),
            });
        }
        Ok(count)
    }

    /// Reads a bit-packed bool array.
    pub fn read_bool_array(&mut self) -> FieldResult<Vec<bool>> {
        let bit_count = self.read_u32()? as usize;
        let expected_words = bit_count.div_ceil(32);
        if expected_words > self.remaining() {
            return Err(FieldError::LengthOutOfRange {
                length: bit_count as u64,
                available: self.remaining(),
            });
        }
        let words = self.read_i32_array()?;
        if words.len() != expected_words {
            return Err(FieldError::WordCountMismatch {
                expected: expected_words,
                actual: words.len(),
            });
        }
        let mut values = Vec::with_capacity(bit_count);
        for bit in 0..bit_count {
            let word = words[bit / 32] as u32;
            values.push(word & (1 << (31 - (bit % 32))) != 0);
        }
        Ok(values)
    }

    /// Reads an array of strings.
    pub fn read_string_array(&mut self) -> FieldResult<Vec<Option<String>>> {
        let count = self.read_count(1)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_string()?);
        }
        Ok(values)
    }

    /// Reads an array of signed 32-bit values.
    pub fn read_i32_array(&mut self) -> FieldResult<Vec<i32>> {
        let count = self.read_count(1)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_i32()?);
        }
        Ok(values)
    }

    /// Reads an array of signed 64-bit values.
    pub fn read_i64_array(&mut self) -> FieldResult<Vec<i64>> {
        let count = self.read_count(1)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_i64()?);
        }
        Ok(values)
    }

    /// Reads an array of unsigned 32-bit values.
    pub fn read_u32_array(&mut self) -> FieldResult<Vec<u32>> {
        let count = self.read_count(1)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_u32()?);
        }
        Ok(values)
    }

    /// Reads an array of unsigned 64-bit values.
    pub fn read_u64_array(&mut self) -> FieldResult<Vec<u64>> {
        let count = self.read_count(1)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_u64()?);
        }
        Ok(values)
    }

    /// Reads an array of doubles.
    pub fn read_f64_array(&mut self) -> FieldResult<Vec<f64>> {
        let count = self.read_count(1)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_f64()?);
        }
        Ok(values)
    }

    /// Reads an array of durations.
    pub fn read_duration_array(&mut self) -> FieldResult<Vec<Duration>> {
        let count = self.read_count(1)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_duration()?);
        }
        Ok(values)
    }

    /// Reads an array of timestamps.
    pub fn read_timestamp_array(&mut self) -> FieldResult<Vec<Timestamp>> {
        let count = self.read_count(2)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_timestamp()?);
        }
        Ok(values)
    }

    /// Reads an array of GUIDs.
    pub fn read_guid_array(&mut self) -> FieldResult<Vec<Uuid>> {
        let count = self.read_count(16)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_guid()?);
        }
        Ok(values)
    }
}
