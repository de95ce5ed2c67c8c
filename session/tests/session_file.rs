use std::fs::File;
use std::io::{Cursor, Read};

use session::{
    FieldType, FieldValue, Packet, PacketDefinition, ProtocolVersion, SessionFileReader,
    SessionFileWriter, SessionHeader, SessionOptions, SessionStatus, Timestamp,
};
use uuid::Uuid;
use wire::{FileHeader, HEADER_SIZE};

struct Heartbeat {
    beat: i64,
}

impl Packet for Heartbeat {
    fn type_name(&self) -> &str {
        "Heartbeat"
    }

    fn definition(&self) -> PacketDefinition {
        PacketDefinition::new("Heartbeat", 1)
            .field("beat", FieldType::I64)
            .field("note", FieldType::String)
    }

    fn field_values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::I64(self.beat),
            FieldValue::String(Some(format!("beat {}", self.beat))),
        ]
    }
}

fn new_header() -> SessionHeader {
    let mut header = SessionHeader::new(
        Uuid::new_v4(),
        "Loupe",
        "AgentService",
        Timestamp::now(),
    );
    header.computer_id = Uuid::new_v4();
    header.environment = "test".to_owned();
    header.file_id = Uuid::new_v4();
    header
}

fn options(version: ProtocolVersion) -> SessionOptions {
    SessionOptions {
        version,
        ..SessionOptions::for_testing()
    }
}

#[test]
fn v2_file_roundtrip_through_tempfile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.glf");
    let header = new_header();
    let session_id = header.session_id;

    let file = File::create(&path).unwrap();
    let mut writer =
        SessionFileWriter::new(file, header, options(ProtocolVersion::CURRENT)).unwrap();
    for beat in 0..25 {
        writer.write_packet(&Heartbeat { beat }).unwrap();
    }
    writer.session_header_mut().warning_count = 3;
    writer.close(true).unwrap();

    let mut reader =
        SessionFileReader::open(File::open(&path).unwrap(), options(ProtocolVersion::CURRENT))
            .unwrap();
    assert_eq!(reader.session_header().session_id, session_id);
    assert_eq!(reader.session_header().status, SessionStatus::Normal);
    assert!(reader.session_header().is_last_file);
    assert_eq!(reader.session_header().message_count, 25);
    assert_eq!(reader.session_header().warning_count, 3);

    let records = reader.read_all().unwrap();
    assert_eq!(records.len(), 25);
    for (beat, record) in records.iter().enumerate() {
        assert_eq!(record.get_i64("beat"), Some(beat as i64));
        assert_eq!(
            record.get_str("note"),
            Some(format!("beat {beat}").as_str())
        );
    }
}

#[test]
fn v1_file_is_uncompressed_and_roundtrips() {
    let mut storage = Cursor::new(Vec::new());
    let header = new_header();
    {
        let mut writer =
            SessionFileWriter::new(&mut storage, header, options(ProtocolVersion::V1)).unwrap();
        for beat in 0..5 {
            writer.write_packet(&Heartbeat { beat }).unwrap();
        }
        writer.close(true).unwrap();
    }

    let bytes = storage.into_inner();
    let file_header = FileHeader::decode(&bytes).unwrap();
    assert_eq!(file_header.version, ProtocolVersion::V1);
    // Uncompressed payload: the first frame is readable right at the data
    // offset, no gzip magic in sight.
    let data_start = file_header.data_offset as usize;
    assert_ne!(bytes[data_start..data_start + 2], [0x1F, 0x8B]);

    let mut reader =
        SessionFileReader::open(Cursor::new(bytes), options(ProtocolVersion::V1)).unwrap();
    let records = reader.read_all().unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[4].get_str("note"), Some("beat 4"));
}

#[test]
fn v2_payload_is_gzip_framed() {
    let mut storage = Cursor::new(Vec::new());
    {
        let mut writer = SessionFileWriter::new(
            &mut storage,
            new_header(),
            options(ProtocolVersion::CURRENT),
        )
        .unwrap();
        writer.write_packet(&Heartbeat { beat: 1 }).unwrap();
        writer.close(true).unwrap();
    }
    let bytes = storage.into_inner();
    let file_header = FileHeader::decode(&bytes).unwrap();
    let data_start = file_header.data_offset as usize;
    assert_eq!(bytes[data_start..data_start + 2], [0x1F, 0x8B]);
}

#[test]
fn data_offset_matches_header_length_on_disk() {
    let mut storage = Cursor::new(Vec::new());
    {
        let writer = SessionFileWriter::new(
            &mut storage,
            new_header(),
            options(ProtocolVersion::CURRENT),
        )
        .unwrap();
        writer.close(true).unwrap();
    }
    let bytes = storage.into_inner();
    let file_header = FileHeader::decode(&bytes).unwrap();

    let block_len = u32::from_le_bytes(
        bytes[HEADER_SIZE..HEADER_SIZE + 4].try_into().unwrap(),
    ) as usize;
    assert_eq!(
        file_header.data_offset as usize,
        HEADER_SIZE + 4 + block_len
    );
}

#[test]
fn flush_updates_live_header_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.glf");
    let file = File::create(&path).unwrap();
    let mut writer =
        SessionFileWriter::new(file, new_header(), options(ProtocolVersion::CURRENT)).unwrap();

    writer.write_packet(&Heartbeat { beat: 1 }).unwrap();
    writer.write_packet(&Heartbeat { beat: 2 }).unwrap();
    writer.flush().unwrap();

    // Inspect the live file: still running, counters already visible.
    let mut bytes = Vec::new();
    File::open(&path).unwrap().read_to_end(&mut bytes).unwrap();
    let file_header = FileHeader::decode(&bytes).unwrap();
    let (live_header, _) =
        SessionHeader::decode(&bytes[HEADER_SIZE..], file_header.version).unwrap();
    assert_eq!(live_header.status, SessionStatus::Running);
    assert_eq!(live_header.message_count, 2);
    assert!(!live_header.is_last_file);
    assert!(bytes.len() > file_header.data_offset as usize);

    writer.close(true).unwrap();
}

#[test]
fn drop_closes_implicitly_as_not_last_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dropped.glf");
    {
        let file = File::create(&path).unwrap();
        let mut writer = SessionFileWriter::new(
            file,
            new_header(),
            options(ProtocolVersion::CURRENT),
        )
        .unwrap();
        writer.write_packet(&Heartbeat { beat: 7 }).unwrap();
        // No close: the drop path finishes the file.
    }

    let mut reader =
        SessionFileReader::open(File::open(&path).unwrap(), options(ProtocolVersion::CURRENT))
            .unwrap();
    // Implicit close signals an unclean end: the session stays Running.
    assert_eq!(reader.session_header().status, SessionStatus::Running);
    assert!(!reader.session_header().is_last_file);

    let records = reader.read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get_i64("beat"), Some(7));
}

#[test]
fn corrupt_magic_fails_to_open() {
    let mut storage = Cursor::new(Vec::new());
    {
        let writer = SessionFileWriter::new(
            &mut storage,
            new_header(),
            options(ProtocolVersion::CURRENT),
        )
        .unwrap();
        writer.close(true).unwrap();
    }
    let mut bytes = storage.into_inner();
    bytes[0] = b'!';
    let err =
        SessionFileReader::open(Cursor::new(bytes), options(ProtocolVersion::CURRENT)).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn truncated_packet_stream_is_reported() {
    let mut storage = Cursor::new(Vec::new());
    {
        let mut writer =
            SessionFileWriter::new(&mut storage, new_header(), options(ProtocolVersion::V1))
                .unwrap();
        for beat in 0..4 {
            writer.write_packet(&Heartbeat { beat }).unwrap();
        }
        writer.close(true).unwrap();
    }
    let mut bytes = storage.into_inner();
    // Chop the tail off the last packet (v1 payload is uncompressed).
    bytes.truncate(bytes.len() - 3);

    let mut reader =
        SessionFileReader::open(Cursor::new(bytes), options(ProtocolVersion::V1)).unwrap();
    let mut seen = 0;
    let err = loop {
        match reader.next_record() {
            Ok(Some(_)) => seen += 1,
            Ok(None) => panic!("truncation must not look like a clean end"),
            Err(err) => break err,
        }
    };
    assert_eq!(seen, 3);
    assert!(matches!(err, session::SessionError::TruncatedStream { .. }));
}

#[test]
fn explicit_close_without_last_file_flag_keeps_running_status() {
    let mut storage = Cursor::new(Vec::new());
    {
        let mut writer = SessionFileWriter::new(
            &mut storage,
            new_header(),
            options(ProtocolVersion::CURRENT),
        )
        .unwrap();
        writer.write_packet(&Heartbeat { beat: 1 }).unwrap();
        writer.close(false).unwrap();
    }
    let bytes = storage.into_inner();
    let file_header = FileHeader::decode(&bytes).unwrap();
    let (header, _) =
        SessionHeader::decode(&bytes[HEADER_SIZE..], file_header.version).unwrap();
    assert_eq!(header.status, SessionStatus::Running);
    assert!(!header.is_last_file);
}
