//! Read-side packet buffer: reassembles length-prefixed packets from a
//! sequence of fixed-size chunks.

use crate::error::{WireError, WireResult};
use crate::framing::{parse_varu32_prefix, PrefixParse};
use crate::limits::{WireLimits, BUFFER_INCREMENT, DEFAULT_BUFFER_SIZE};

/// Outcome of one attempt to extract a packet from the buffer.
///
/// The two partial outcomes are an explicit state machine, not errors: they
/// tell the caller to append the next chunk and try again. Crossing a chunk
/// boundary never loses or duplicates bytes, and the distinction between the
/// payload being short and the length prefix itself being cut matters
/// because an unfinished prefix means not even the packet's size is known
/// yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadAttempt {
    /// A whole packet is available at `start..start + len` (past the
    /// prefix); the cursor has advanced over it. The range stays valid
    /// until the next [`PacketBuffer::append`].
    Complete { start: usize, len: usize },

    /// The length prefix parsed but the payload is short by `missing`
    /// bytes. Nothing was consumed.
    NeedMoreData { missing: usize },

    /// The varint length prefix runs past the buffered bytes. Nothing was
    /// consumed; the unread tail must be joined with the next chunk before
    /// the parse can resume.
    NeedMoreForLength,
}

/// A growable buffer that reassembles packets split across chunk
/// boundaries.
///
/// Consumed bytes are compacted away when the next chunk arrives; growth
/// happens in fixed [`BUFFER_INCREMENT`] steps and only when a partial
/// packet actually spans a boundary.
#[derive(Debug)]
pub struct PacketBuffer {
    data: Vec<u8>,
    position: usize,
}

impl PacketBuffer {
    /// Creates a buffer with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(DEFAULT_BUFFER_SIZE),
            position: 0,
        }
    }

    /// Bytes buffered but not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns `true` if every buffered byte has been consumed.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.pending() == 0
    }

    /// Appends the next chunk, compacting consumed bytes first so the
    /// unread tail of the previous chunk lines up with the new bytes.
    pub fn append(&mut self, chunk: &[u8]) {
        if self.position > 0 {
            self.data.drain(..self.position);
            self.position = 0;
        }
        let needed = self.data.len() + chunk.len();
        if needed > self.data.capacity() {
            let mut target = self.data.capacity().max(DEFAULT_BUFFER_SIZE);
            while target < needed {
                target += BUFFER_INCREMENT;
            }
            self.data.reserve_exact(target - self.data.len());
        }
        self.data.extend_from_slice(chunk);
    }

    /// Attempts to extract the next packet.
    ///
    /// Corrupt prefixes (invalid varint, zero length, over-limit length)
    /// are hard errors; short data is reported through [`ReadAttempt`].
    pub fn next_packet(&mut self, limits: &WireLimits) -> WireResult<ReadAttempt> {
        let available = &self.data[self.position..];
        let (length, prefix_len) = match parse_varu32_prefix(available) {
            PrefixParse::Parsed { value, len } => (value as usize, len),
            PrefixParse::Incomplete => return Ok(ReadAttempt::NeedMoreForLength),
            PrefixParse::Invalid => {
                return Err(WireError::Field(fieldcodec::FieldError::InvalidVarint {
                    max_bytes: 5,
                }))
            }
        };
        if length == 0 {
            return Err(WireError::EmptyPacket);
        }
        if length > limits.max_packet_bytes {
            return Err(WireError::PacketTooLarge {
                length,
                limit: limits.max_packet_bytes,
            });
        }
        let total = prefix_len + length;
        if total > available.len() {
            return Ok(ReadAttempt::NeedMoreData {
                missing: total - available.len(),
            });
        }
        let start = self.position + prefix_len;
        self.position += total;
        Ok(ReadAttempt::Complete { start, len: length })
    }

    /// The bytes of a completed packet range.
    #[must_use]
    pub fn bytes(&self, start: usize, len: usize) -> &[u8] {
        &self.data[start..start + len]
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::write_frame;

    fn frames(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for payload in payloads {
            write_frame(payload, &WireLimits::for_testing(), &mut out).unwrap();
        }
        out
    }

    fn drain(buffer: &mut PacketBuffer) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        loop {
            match buffer.next_packet(&WireLimits::for_testing()).unwrap() {
                ReadAttempt::Complete { start, len } => {
                    packets.push(buffer.bytes(start, len).to_vec());
                }
                _ => return packets,
            }
        }
    }

    #[test]
    fn whole_packet_in_one_chunk() {
        let mut buffer = PacketBuffer::new();
        buffer.append(&frames(&[&[1, 2, 3]]));
        assert_eq!(drain(&mut buffer), vec![vec![1, 2, 3]]);
        assert!(buffer.is_drained());
    }

    #[test]
    fn multiple_packets_in_one_chunk() {
        let mut buffer = PacketBuffer::new();
        buffer.append(&frames(&[&[1], &[2, 2], &[3, 3, 3]]));
        assert_eq!(
            drain(&mut buffer),
            vec![vec![1], vec![2, 2], vec![3, 3, 3]]
        );
    }

    #[test]
    fn payload_split_across_chunks() {
        let stream = frames(&[&[9; 10]]);
        let mut buffer = PacketBuffer::new();
        buffer.append(&stream[..4]);
        assert_eq!(
            buffer.next_packet(&WireLimits::for_testing()).unwrap(),
            ReadAttempt::NeedMoreData { missing: 7 }
        );
        // Nothing consumed by the partial attempt.
        assert_eq!(buffer.pending(), 4);

        buffer.append(&stream[4..]);
        assert_eq!(drain(&mut buffer), vec![vec![9; 10]]);
    }

    #[test]
    fn length_prefix_split_across_chunks() {
        let stream = frames(&[&[7; 300]]);
        // The 300-byte payload needs a two-byte prefix; cut inside it.
        let mut buffer = PacketBuffer::new();
        buffer.append(&stream[..1]);
        assert_eq!(
            buffer.next_packet(&WireLimits::for_testing()).unwrap(),
            ReadAttempt::NeedMoreForLength
        );
        buffer.append(&stream[1..]);
        assert_eq!(drain(&mut buffer), vec![vec![7; 300]]);
    }

    #[test]
    fn empty_buffer_needs_length() {
        let mut buffer = PacketBuffer::new();
        assert_eq!(
            buffer.next_packet(&WireLimits::for_testing()).unwrap(),
            ReadAttempt::NeedMoreForLength
        );
    }

    #[test]
    fn zero_length_is_corruption() {
        let mut buffer = PacketBuffer::new();
        buffer.append(&[0x00]);
        assert!(matches!(
            buffer.next_packet(&WireLimits::for_testing()),
            Err(WireError::EmptyPacket)
        ));
    }

    #[test]
    fn oversized_length_is_corruption() {
        let mut buffer = PacketBuffer::new();
        let mut bytes = Vec::new();
        crate::framing::write_varu32(1_000_000, &mut bytes);
        buffer.append(&bytes);
        assert!(matches!(
            buffer.next_packet(&WireLimits::for_testing()),
            Err(WireError::PacketTooLarge { .. })
        ));
    }

    #[test]
    fn invalid_prefix_is_corruption() {
        let mut buffer = PacketBuffer::new();
        buffer.append(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            buffer.next_packet(&WireLimits::for_testing()),
            Err(WireError::Field(_))
        ));
    }

    #[test]
    fn split_at_every_offset_reassembles_identically() {
        let stream = frames(&[&[1, 2, 3], &[4; 200], &[5]]);
        let expected = vec![vec![1u8, 2, 3], vec![4; 200], vec![5]];
        for split in 0..=stream.len() {
            let mut buffer = PacketBuffer::new();
            let mut packets = Vec::new();
            buffer.append(&stream[..split]);
            loop {
                match buffer.next_packet(&WireLimits::for_testing()).unwrap() {
                    ReadAttempt::Complete { start, len } => {
                        packets.push(buffer.bytes(start, len).to_vec());
                    }
                    _ => break,
                }
            }
            buffer.append(&stream[split..]);
            loop {
                match buffer.next_packet(&WireLimits::for_testing()).unwrap() {
                    ReadAttempt::Complete { start, len } => {
                        packets.push(buffer.bytes(start, len).to_vec());
                    }
                    _ => break,
                }
            }
            assert_eq!(packets, expected, "split at {split}");
        }
    }
}
