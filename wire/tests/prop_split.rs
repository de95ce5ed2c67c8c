use proptest::prelude::*;
use wire::{write_frame, PacketBuffer, ReadAttempt, WireLimits};

fn drain(buffer: &mut PacketBuffer, limits: &WireLimits) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();
    loop {
        match buffer.next_packet(limits).unwrap() {
            ReadAttempt::Complete { start, len } => {
                packets.push(buffer.bytes(start, len).to_vec());
            }
            ReadAttempt::NeedMoreData { .. } | ReadAttempt::NeedMoreForLength => return packets,
        }
    }
}

proptest! {
    // A stream chopped into arbitrary chunks must reassemble into exactly
    // the packets that were framed, regardless of where the cuts land.
    #[test]
    fn prop_chunked_reassembly_matches_unsplit(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..300), 1..12),
        cuts in prop::collection::vec(1usize..64, 0..24),
    ) {
        let limits = WireLimits::for_testing();
        let mut stream = Vec::new();
        for payload in &payloads {
            write_frame(payload, &limits, &mut stream).unwrap();
        }

        // Reference: one unsplit buffer.
        let mut reference = PacketBuffer::new();
        reference.append(&stream);
        let expected = drain(&mut reference, &limits);
        prop_assert_eq!(&expected, &payloads);

        // Chunked: cut the stream at the generated sizes, cycling.
        let mut buffer = PacketBuffer::new();
        let mut packets = Vec::new();
        let mut offset = 0;
        let mut cut_index = 0;
        while offset < stream.len() {
            let size = if cuts.is_empty() {
                stream.len()
            } else {
                cuts[cut_index % cuts.len()]
            };
            let end = (offset + size).min(stream.len());
            buffer.append(&stream[offset..end]);
            offset = end;
            cut_index += 1;
            packets.extend(drain(&mut buffer, &limits));
        }
        prop_assert_eq!(&packets, &payloads);
        prop_assert!(buffer.is_drained());
    }

    // Splitting exactly once at every possible position, including inside
    // multi-byte length prefixes, never changes the result.
    #[test]
    fn prop_single_split_everywhere(payload_len in 1usize..600) {
        let limits = WireLimits::for_testing();
        let payload: Vec<u8> = (0..payload_len).map(|i| i as u8).collect();
        let mut stream = Vec::new();
        write_frame(&payload, &limits, &mut stream).unwrap();
        write_frame(&[0xEE], &limits, &mut stream).unwrap();

        for split in 0..=stream.len() {
            let mut buffer = PacketBuffer::new();
            let mut packets = Vec::new();
            buffer.append(&stream[..split]);
            packets.extend(drain(&mut buffer, &limits));
            buffer.append(&stream[split..]);
            packets.extend(drain(&mut buffer, &limits));
            prop_assert_eq!(packets.len(), 2, "split at {}", split);
            prop_assert_eq!(&packets[0], &payload);
            prop_assert_eq!(&packets[1], &vec![0xEE]);
        }
    }
}
