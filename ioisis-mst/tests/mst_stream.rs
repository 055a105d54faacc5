//! End-to-end master-file building and reading.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use ioisis_mst::{
    Dialect, Endianness, Ibp, MstConfig, MstReader, MstRecord, MstWriter, RecordStatus,
};
use pretty_assertions::assert_eq;

fn build_bytes(records: &[MstRecord], config: &MstConfig) -> Vec<u8> {
    let mut writer = MstWriter::new(Cursor::new(Vec::new()), config.clone()).unwrap();
    for record in records {
        writer.write_record(record).unwrap();
    }
    writer.finish().unwrap().sink.into_inner()
}

fn read_all(bytes: &[u8], config: &MstConfig) -> Vec<MstRecord> {
    MstReader::new(bytes, config.clone())
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

/// Minimal active record in the smallest ISIS layout: the whole file
/// image is pinned byte for byte.
#[test]
fn minimal_isis_file_image() {
    let config = MstConfig {
        packed: true,
        default_shift: 0,
        ..MstConfig::default()
    };
    let record = MstRecord::from_pairs(1, [(1u16, &b"x"[..])]);
    let bytes = build_bytes(&[record.clone()], &config);

    let mut expected = vec![0u8; 512];
    // Control record: next_mfn 2, next_block 1, next_offset 91.
    expected[4] = 2;
    expected[8] = 1;
    expected[12] = 91;
    // Record leader at the control boundary.
    expected[64..90].copy_from_slice(&[
        1, 0, 0, 0, // mfn
        26, 0, // mfrl
        0, 0, 0, 0, // old block
        0, 0, // old offset
        24, 0, // base address
        1, 0, // nvf
        0, 0, // status
        1, 0, 0, 0, 1, 0, // directory: tag 1, pos 0, len 1
        b'x', 0x20, // data, record filler
    ]);
    assert_eq!(bytes, expected);

    let mut reader = MstReader::new(&bytes[..], config).unwrap();
    assert_eq!(reader.read_record().unwrap(), Some(record));
    assert_eq!(reader.read_record().unwrap(), None);
    assert_eq!(reader.control().next_mfn, 2);
    assert_eq!(reader.control().next_block, 1);
    assert_eq!(reader.control().next_offset, 91);
}

#[test]
fn round_trips_in_every_dialect_combination() {
    let records = vec![
        MstRecord::from_pairs(1, [(26u16, &b"first field"[..]), (70, &b"second"[..])]),
        MstRecord {
            status: RecordStatus::LogicallyDeleted,
            ..MstRecord::from_pairs(2, [(1u16, &b"gone"[..])])
        },
        MstRecord::from_pairs(7, [(100u16, &b"explicit mfn leaves a gap"[..])]),
    ];
    for format in [Dialect::Isis, Dialect::Ffi] {
        for packed in [false, true] {
            for lockable in [false, true] {
                for endianness in [Endianness::Little, Endianness::Big] {
                    let config = MstConfig {
                        format,
                        packed,
                        lockable,
                        endianness,
                        ..MstConfig::default()
                    };
                    let bytes = build_bytes(&records, &config);
                    assert_eq!(bytes.len() % 512, 0);
                    assert_eq!(read_all(&bytes, &config), records, "{config:?}");
                }
            }
        }
    }
}

#[test]
fn shift_governs_record_padding() {
    for (shift, modulus) in [(0u8, 2usize), (3, 8), (6, 64)] {
        let config = MstConfig {
            default_shift: shift,
            ..MstConfig::default()
        };
        let record = MstRecord::from_pairs(1, [(1u16, &b"x"[..])]);
        let bytes = build_bytes(&[record.clone()], &config);
        let mut reader = MstReader::new(&bytes[..], config).unwrap();
        assert_eq!(reader.modulus() as usize, modulus);
        assert_eq!(reader.read_record().unwrap(), Some(record));
        // Leader 20 + directory 6 + 1 data byte, padded to the modulus.
        let body = reader.control().next_position() - 64;
        assert_eq!(body as usize, 27usize.div_ceil(modulus) * modulus);
    }
}

#[test]
fn shift4is3_changes_the_effective_modulus() {
    let legacy = MstConfig {
        default_shift: 4,
        packed: true,
        shift4is3: true,
        ..MstConfig::default()
    };
    // No fields: leader 18 padded to a total of 24, a multiple of 8
    // (the remapped modulus) but not of 16.
    let record = MstRecord {
        mfn: 1,
        ..MstRecord::default()
    };
    let bytes = build_bytes(&[record.clone()], &legacy);
    assert_eq!(read_all(&bytes, &legacy), vec![record]);

    let literal = MstConfig {
        shift4is3: false,
        ..legacy
    };
    let mut reader = MstReader::new(&bytes[..], literal).unwrap();
    assert_eq!(reader.modulus(), 16);
    assert!(reader.read_record().is_err());
}

#[test]
fn leader_never_straddles_a_block_boundary() {
    let config = MstConfig {
        packed: true,
        default_shift: 0,
        ..MstConfig::default()
    };
    // 26-byte records: the 18th would start at offset 506 of the first
    // block, 6 bytes short of holding leader-minus-four.
    let records: Vec<MstRecord> = (1..=18)
        .map(|mfn| MstRecord::from_pairs(mfn, [(1u16, &b"x"[..])]))
        .collect();
    let mut writer = MstWriter::new(Cursor::new(Vec::new()), config.clone()).unwrap();
    for record in &records {
        writer.write_record(record).unwrap();
    }
    let build = writer.finish().unwrap();
    let entry = build.xrf.get(&18).unwrap();
    assert_eq!((entry.block, entry.offset), (2, 0));

    let bytes = build.sink.into_inner();
    assert!(bytes[506..512].iter().all(|b| *b == 0));
    assert_eq!(read_all(&bytes, &config), records);
}

/// A shortened in-place update leaves residue between records; the
/// three IBP policies disagree on what to do with it.
fn file_with_residue() -> (Vec<u8>, MstConfig) {
    let config = MstConfig {
        packed: true,
        default_shift: 0,
        ibp: Ibp::Check,
        ..MstConfig::default()
    };
    let two = [
        MstRecord::from_pairs(1, [(1u16, &b"x"[..])]),
        MstRecord::from_pairs(2, [(1u16, &b"y"[..])]),
    ];
    let clean = build_bytes(&two, &config);
    // Splice 4 bytes of junk between the records (offsets 90 and 94)
    // and fix the control pointer up accordingly.
    let mut dirty = Vec::new();
    dirty.extend_from_slice(&clean[..90]);
    dirty.extend_from_slice(&[0xFF; 4]);
    dirty.extend_from_slice(&clean[90..116]);
    dirty.resize(512, 0);
    dirty[12] = 121; // next_offset: record two now ends at offset 120
    (dirty, config)
}

#[test]
fn ibp_check_rejects_residue() {
    let (bytes, config) = file_with_residue();
    let mut reader = MstReader::new(&bytes[..], config).unwrap();
    assert_eq!(reader.read_record().unwrap().unwrap().mfn, 1);
    let err = reader.read_record().unwrap_err();
    assert!(
        matches!(err, ioisis_mst::Error::InvalidBlockPadding { offset: 90 }),
        "{err}",
    );
}

#[test]
fn ibp_ignore_skips_residue() {
    let (bytes, mut config) = file_with_residue();
    config.ibp = Ibp::Ignore;
    let records = read_all(&bytes, &config);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].mfn, 2);
    assert!(records[0].ibp.is_empty());
}

#[test]
fn ibp_store_attaches_residue_to_the_previous_record() {
    let (bytes, mut config) = file_with_residue();
    config.ibp = Ibp::Store;
    let records = read_all(&bytes, &config);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ibp, vec![0xFF; 4]);
    assert!(records[1].ibp.is_empty());
}

#[test]
fn trailing_block_padding_is_not_residue() {
    let config = MstConfig {
        ibp: Ibp::Store,
        ..MstConfig::default()
    };
    let records = vec![MstRecord::from_pairs(1, [(1u16, &b"x"[..])])];
    let bytes = build_bytes(&records, &config);
    let parsed = read_all(&bytes, &config);
    assert_eq!(parsed, records);
    assert!(parsed[0].ibp.is_empty());
}

#[test]
fn truncated_record_is_unexpected_eof() {
    let config = MstConfig::default();
    let bytes = build_bytes(&[MstRecord::from_pairs(1, [(1u16, vec![b'a'; 100])])], &config);
    let mut reader = MstReader::new(&bytes[..100], config).unwrap();
    assert!(matches!(
        reader.read_record().unwrap_err(),
        ioisis_mst::Error::UnexpectedEof,
    ));
}

#[test]
fn record_sizes_around_the_block_length() {
    // With a modulus of 1 any total length is representable.
    let config = MstConfig {
        default_shift: 0,
        min_modulus: 1,
        control_len: 64,
        ..MstConfig::default()
    };
    for data_len in [486usize, 487] {
        // leader 20 + directory 6 + data: totals 512 and 513.
        let record = MstRecord::from_pairs(1, [(1u16, vec![b'd'; data_len])]);
        let bytes = build_bytes(&[record.clone()], &config);
        assert_eq!(read_all(&bytes, &config), vec![record]);
    }
}

#[test]
fn largest_isis_records_round_trip() {
    for (lockable, max_total) in [(true, 32767usize), (false, 65535)] {
        let config = MstConfig {
            default_shift: 0,
            min_modulus: 1,
            lockable,
            ..MstConfig::default()
        };
        let record = MstRecord::from_pairs(1, [(1u16, vec![b'm'; max_total - 26])]);
        let bytes = build_bytes(&[record.clone()], &config);
        assert_eq!(read_all(&bytes, &config), vec![record]);
    }
}

#[test]
fn seekable_file_sink_works_end_to_end() {
    let config = MstConfig::default();
    let records = vec![
        MstRecord::from_pairs(0, [(10u16, &b"assigned one"[..])]),
        MstRecord::from_pairs(0, [(10u16, &b"assigned two"[..])]),
    ];
    let mut file = tempfile::tempfile().unwrap();
    {
        let mut writer = MstWriter::new(&mut file, config.clone()).unwrap();
        for record in &records {
            assert!(writer.write_record(record).unwrap() > 0);
        }
        writer.finish().unwrap();
    }
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    let parsed = read_all(&bytes, &config);
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].mfn, 1);
    assert_eq!(parsed[1].mfn, 2);
}

#[test]
fn explicit_mfn_bumps_the_allocator() {
    let config = MstConfig::default();
    let mut writer = MstWriter::new(Cursor::new(Vec::new()), config.clone()).unwrap();
    writer.write_record(&MstRecord::from_pairs(5, [(1u16, &b"a"[..])])).unwrap();
    let assigned = writer.write_record(&MstRecord::from_pairs(0, [(1u16, &b"b"[..])])).unwrap();
    assert_eq!(assigned, 6);
    let build = writer.finish().unwrap();
    assert_eq!(build.control.next_mfn, 7);
}

#[test]
fn bad_control_marker_is_rejected() {
    let config = MstConfig::default();
    let mut bytes = build_bytes(&[], &config);
    bytes[0] = 1;
    assert!(MstReader::new(&bytes[..], config).is_err());
}

#[test]
fn empty_file_round_trips() {
    let config = MstConfig::default();
    let bytes = build_bytes(&[], &config);
    assert_eq!(bytes.len(), 512);
    assert_eq!(read_all(&bytes, &config), Vec::<MstRecord>::new());
}

#[test]
fn writer_rejects_duplicate_mfns() {
    let config = MstConfig::default();
    let mut writer = MstWriter::new(Cursor::new(Vec::new()), config).unwrap();
    let record = MstRecord::from_pairs(3, [(1u16, &b"a"[..])]);
    writer.write_record(&record).unwrap();
    assert!(writer.write_record(&record).is_err());
}

#[test]
fn rlock_is_preserved_and_reported() {
    let config = MstConfig::default();
    let record = MstRecord {
        rlock: true,
        ..MstRecord::from_pairs(1, [(44u16, &b"locked"[..])])
    };
    let bytes = build_bytes(&[record.clone()], &config);
    let parsed = read_all(&bytes, &config);
    assert!(parsed[0].rlock);
    assert_eq!(parsed, vec![record]);
}

#[test]
fn write_failure_surface_is_plain_io() {
    // A sink that refuses to seek: finish must fail, not panic.
    struct NoSeek(Vec<u8>);
    impl Write for NoSeek {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    impl Seek for NoSeek {
        fn seek(&mut self, _: SeekFrom) -> std::io::Result<u64> {
            Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "no seek"))
        }
    }
    let mut writer = MstWriter::new(NoSeek(Vec::new()), MstConfig::default()).unwrap();
    writer.write_record(&MstRecord::from_pairs(1, [(1u16, &b"x"[..])])).unwrap();
    assert!(matches!(writer.finish().unwrap_err(), ioisis_mst::Error::Io(_)));
}
