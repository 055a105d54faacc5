//! End-to-end ISO file reading and writing against literal byte
//! corpora from the historical implementation.

use ioisis_iso::{IsoConfig, IsoReader, IsoRecord, IsoWriter};
use pretty_assertions::assert_eq;

const SIMPLE_EXAMPLE_ISO: &[u8] = b"000400000000000370004500001000200000#a##\n\
000750000000000610004500010000500000010000400005011000400009#test#one#two##\n\
000260000000000250004500##\n\
001160000000000970004500001000200000010000200002010000200004100000300006100000400009\n\
0009100000500013#x#y#z#aa#bbb#cccc##\n";

fn simple_example_records() -> Vec<IsoRecord> {
    vec![
        IsoRecord::from_pairs([("1", "a")]),
        IsoRecord::from_pairs([("10", "test"), ("10", "one"), ("11", "two")]),
        IsoRecord::default(),
        IsoRecord::from_pairs([
            ("1", "x"),
            ("10", "y"),
            ("10", "z"),
            ("100", "aa"),
            ("100", "bbb"),
            ("100", "cccc"),
        ]),
    ]
}

#[test]
fn simple_example_builds_byte_exact() {
    let mut writer = IsoWriter::new(Vec::new(), IsoConfig::default());
    for record in simple_example_records() {
        writer.write_record(&record).unwrap();
    }
    assert_eq!(writer.into_inner(), SIMPLE_EXAMPLE_ISO.to_vec());
}

#[test]
fn simple_example_parses_back() {
    let reader = IsoReader::new(SIMPLE_EXAMPLE_ISO, IsoConfig::default());
    let records: Vec<IsoRecord> = reader.map(Result::unwrap).collect();
    assert_eq!(records, simple_example_records());
}

#[test]
fn round_trip_without_line_splitting() {
    let config = IsoConfig {
        line_len: 0,
        ..IsoConfig::default()
    };
    let mut writer = IsoWriter::new(Vec::new(), config.clone());
    for record in simple_example_records() {
        writer.write_record(&record).unwrap();
    }
    let bytes = writer.into_inner();
    assert!(!bytes.contains(&b'\n'));
    let records: Vec<IsoRecord> = IsoReader::new(&bytes[..], config)
        .map(Result::unwrap)
        .collect();
    assert_eq!(records, simple_example_records());
}

#[test]
fn field_length_equal_to_line_len_round_trips() {
    // 80 bytes of value: the record spans several lines and ends on a
    // partial one.
    let record = IsoRecord::from_pairs([("5", vec![b'v'; 80])]);
    let mut writer = IsoWriter::new(Vec::new(), IsoConfig::default());
    writer.write_record(&record).unwrap();
    let bytes = writer.into_inner();
    let records: Vec<IsoRecord> = IsoReader::new(&bytes[..], IsoConfig::default())
        .map(Result::unwrap)
        .collect();
    assert_eq!(records, vec![record]);
}

#[test]
fn record_length_exactly_one_line_round_trips() {
    // Total length 80 = leader 24 + one 12-byte dir entry + 1 + 42 + 1:
    // value of 41 bytes plus its terminator.
    let record = IsoRecord::from_pairs([("9", vec![b'q'; 41])]);
    let mut writer = IsoWriter::new(Vec::new(), IsoConfig::default());
    writer.write_record(&record).unwrap();
    let bytes = writer.into_inner();
    assert_eq!(bytes.len(), 81);
    assert_eq!(bytes[80], b'\n');
    let records: Vec<IsoRecord> = IsoReader::new(&bytes[..], IsoConfig::default())
        .map(Result::unwrap)
        .collect();
    assert_eq!(records, vec![record]);
}

#[test]
fn custom_terminators_round_trip() {
    let config = IsoConfig {
        field_terminator: b"\x1e".to_vec(),
        record_terminator: b"\x1d".to_vec(),
        ..IsoConfig::default()
    };
    let record = IsoRecord::from_pairs([("245", "The title"), ("100", "An author")]);
    let mut writer = IsoWriter::new(Vec::new(), config.clone());
    writer.write_record(&record).unwrap();
    let bytes = writer.into_inner();
    let records: Vec<IsoRecord> = IsoReader::new(&bytes[..], config)
        .map(Result::unwrap)
        .collect();
    assert_eq!(records, vec![record]);
}

#[test]
fn truncated_record_reports_unexpected_eof() {
    let truncated = &SIMPLE_EXAMPLE_ISO[..20];
    let mut reader = IsoReader::new(truncated, IsoConfig::default());
    let err = reader.read_record().unwrap_err();
    assert!(matches!(err, ioisis_iso::Error::UnexpectedEof), "{err}");
}

#[test]
fn wrong_newline_reports_line_split_error() {
    let mut bytes = SIMPLE_EXAMPLE_ISO.to_vec();
    // Corrupt the newline after the fourth record's first full line.
    let nl = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'\n')
        .nth(3)
        .map(|(i, _)| i)
        .unwrap();
    bytes[nl] = b'X';
    let reader = IsoReader::new(&bytes[..], IsoConfig::default());
    let err = reader
        .map(|r| r.map(|_| ()))
        .find_map(Result::err)
        .expect("a corrupted newline must surface an error");
    assert!(matches!(err, ioisis_iso::Error::LineSplit { .. }), "{err}");
}

#[test]
fn inactive_records_carry_their_status() {
    let mut record = IsoRecord::from_pairs([("1", "gone")]);
    record.status = b'1';
    let mut writer = IsoWriter::new(Vec::new(), IsoConfig::default());
    writer.write_record(&record).unwrap();
    let parsed = IsoReader::new(&writer.into_inner()[..], IsoConfig::default())
        .next()
        .unwrap()
        .unwrap();
    assert!(!parsed.is_active());
    assert_eq!(parsed.status, b'1');
}

#[test]
fn directory_custom_area_round_trips() {
    let mut record = IsoRecord::from_pairs([("20", "payload")]);
    record.custom_len = 2;
    record.fields[0].custom = b"xy".to_vec();
    let mut writer = IsoWriter::new(Vec::new(), IsoConfig::default());
    writer.write_record(&record).unwrap();
    let parsed = IsoReader::new(&writer.into_inner()[..], IsoConfig::default())
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(parsed.fields[0].custom, b"xy".to_vec());
    assert_eq!(parsed, record);
}
