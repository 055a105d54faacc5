//! Byte-level parsing and building of ISO 2709 records.
//!
//! One function per structural layer: leader, directory, field area.
//! Each takes the raw record bytes and a cursor and validates as it
//! goes, so a malformed record reports the first violated invariant.

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{IsoConfig, IsoField, IsoRecord, LEADER_LEN, TAG_LEN, TOTAL_LEN_LEN};

/// Parse a zero-padded ASCII decimal number.
pub(crate) fn ascii_num(bytes: &[u8]) -> Result<usize> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(Error::format(format!(
            "expected ASCII digits, found {:?}",
            String::from_utf8_lossy(bytes),
        )));
    }
    let mut value = 0usize;
    for digit in bytes {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(usize::from(digit - b'0')))
            .ok_or_else(|| Error::format("numeric field overflow"))?;
    }
    Ok(value)
}

/// Render a number as zero-padded ASCII of exactly `width` digits.
pub(crate) fn push_ascii_num(out: &mut Vec<u8>, value: usize, width: usize) -> Result<()> {
    let rendered = value.to_string();
    if rendered.len() > width {
        return Err(Error::format(format!(
            "value {value} does not fit in {width} ASCII digits",
        )));
    }
    out.extend(std::iter::repeat_n(b'0', width - rendered.len()));
    out.extend_from_slice(rendered.as_bytes());
    Ok(())
}

fn slice<'a>(bytes: &'a [u8], start: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    bytes
        .get(start..start + len)
        .ok_or_else(|| Error::format(format!("{what} extends past the record end")))
}

/// Build the raw (unsplit) bytes of one record.
pub fn build_record(record: &IsoRecord, config: &IsoConfig) -> Result<Vec<u8>> {
    let ft_len = config.field_terminator.len();
    let entry_len = record.dir_entry_len();
    let dir_len = record.fields.len() * entry_len;
    let base_addr = LEADER_LEN + dir_len + ft_len;
    let field_lens: Vec<usize> = record
        .fields
        .iter()
        .map(|field| field.value.len() + ft_len)
        .collect();
    let fields_len: usize = field_lens.iter().sum();
    let total_len = base_addr + fields_len + config.record_terminator.len();

    let mut out = Vec::with_capacity(total_len);
    push_ascii_num(&mut out, total_len, TOTAL_LEN_LEN)?;
    out.push(record.status);
    out.push(record.record_type);
    out.extend_from_slice(&record.custom_2);
    out.push(record.coding);
    push_ascii_num(&mut out, usize::from(record.indicator_count), 1)?;
    push_ascii_num(&mut out, usize::from(record.identifier_len), 1)?;
    push_ascii_num(&mut out, base_addr, 5)?;
    out.extend_from_slice(&record.custom_3);
    push_ascii_num(&mut out, record.len_len, 1)?;
    push_ascii_num(&mut out, record.pos_len, 1)?;
    push_ascii_num(&mut out, record.custom_len, 1)?;
    out.push(record.reserved);
    debug_assert_eq!(out.len(), LEADER_LEN);

    let mut pos = 0;
    for (field, field_len) in record.fields.iter().zip(&field_lens) {
        out.extend_from_slice(&field.tag);
        push_ascii_num(&mut out, *field_len, record.len_len)?;
        push_ascii_num(&mut out, pos, record.pos_len)?;
        if field.custom.is_empty() {
            out.extend(std::iter::repeat_n(b'0', record.custom_len));
        } else if field.custom.len() == record.custom_len {
            out.extend_from_slice(&field.custom);
        } else {
            return Err(Error::format(format!(
                "directory custom area must have {} bytes, found {}",
                record.custom_len,
                field.custom.len(),
            )));
        }
        pos += field_len;
    }
    out.extend_from_slice(&config.field_terminator);
    debug_assert_eq!(out.len(), base_addr);

    for field in &record.fields {
        out.extend_from_slice(&field.value);
        out.extend_from_slice(&config.field_terminator);
    }
    out.extend_from_slice(&config.record_terminator);
    debug_assert_eq!(out.len(), total_len);
    Ok(out)
}

/// Parse one record from its raw (unsplit) bytes, total-length prefix
/// included. `bytes` must hold exactly the record.
pub fn parse_record(bytes: &[u8], config: &IsoConfig) -> Result<IsoRecord> {
    let ft = &config.field_terminator;
    let rt = &config.record_terminator;

    let total_len = ascii_num(slice(bytes, 0, TOTAL_LEN_LEN, "total length")?)?;
    if total_len != bytes.len() {
        return Err(Error::format(format!(
            "total length {total_len} does not match the {} bytes read",
            bytes.len(),
        )));
    }
    if total_len < LEADER_LEN + ft.len() + rt.len() {
        return Err(Error::format(format!("record too short: {total_len} bytes")));
    }

    let status = bytes[5];
    let record_type = bytes[6];
    let custom_2 = [bytes[7], bytes[8]];
    let coding = bytes[9];
    let indicator_count = ascii_num(&bytes[10..11])? as u8;
    let identifier_len = ascii_num(&bytes[11..12])? as u8;
    let base_addr = ascii_num(&bytes[12..17])?;
    let custom_3 = [bytes[17], bytes[18], bytes[19]];
    let len_len = ascii_num(&bytes[20..21])?;
    let pos_len = ascii_num(&bytes[21..22])?;
    let custom_len = ascii_num(&bytes[22..23])?;
    let reserved = bytes[23];

    let entry_len = TAG_LEN + len_len + pos_len + custom_len;
    if entry_len == TAG_LEN {
        return Err(Error::format("zero-width directory entries"));
    }
    if base_addr < LEADER_LEN + ft.len() {
        return Err(Error::format(format!("base address {base_addr} inside the leader")));
    }
    let dir_len = base_addr - LEADER_LEN - ft.len();
    if dir_len % entry_len != 0 {
        return Err(Error::format(format!(
            "directory of {dir_len} bytes is not a whole number of {entry_len}-byte entries",
        )));
    }
    let num_fields = dir_len / entry_len;
    debug!(total_len, base_addr, num_fields, "parsing ISO record");

    // Directory: (tag, len, pos, custom) per field.
    let mut entries = Vec::with_capacity(num_fields);
    let mut cursor = LEADER_LEN;
    for _ in 0..num_fields {
        let tag_bytes = slice(bytes, cursor, TAG_LEN, "directory tag")?;
        let len = ascii_num(slice(bytes, cursor + TAG_LEN, len_len, "directory length")?)?;
        let pos = ascii_num(slice(
            bytes,
            cursor + TAG_LEN + len_len,
            pos_len,
            "directory position",
        )?)?;
        let custom = slice(
            bytes,
            cursor + TAG_LEN + len_len + pos_len,
            custom_len,
            "directory custom area",
        )?;
        entries.push(([tag_bytes[0], tag_bytes[1], tag_bytes[2]], len, pos, custom.to_vec()));
        cursor += entry_len;
    }
    if slice(bytes, cursor, ft.len(), "directory terminator")? != &ft[..] {
        return Err(Error::format("missing directory terminator"));
    }
    cursor += ft.len();
    if cursor != base_addr {
        return Err(Error::format(format!(
            "base address {base_addr} does not match the end of the directory at {cursor}",
        )));
    }

    // Positions must be the running prefix sum of the lengths.
    let mut expected_pos = 0;
    for (_, len, pos, _) in &entries {
        if *pos != expected_pos {
            return Err(Error::format(format!(
                "directory position {pos} where {expected_pos} was expected",
            )));
        }
        expected_pos += len;
    }

    // Field area: each value followed by the field terminator.
    let mut fields = Vec::with_capacity(num_fields);
    for (tag, len, pos, custom) in entries {
        if len < ft.len() {
            return Err(Error::format(format!("field length {len} shorter than its terminator")));
        }
        let value = slice(bytes, base_addr + pos, len - ft.len(), "field value")?;
        if slice(bytes, base_addr + pos + len - ft.len(), ft.len(), "field terminator")?
            != &ft[..]
        {
            return Err(Error::format("missing field terminator"));
        }
        fields.push(IsoField {
            tag,
            value: value.to_vec(),
            custom,
        });
    }
    cursor = base_addr + expected_pos;
    if slice(bytes, cursor, rt.len(), "record terminator")? != &rt[..] {
        return Err(Error::format("missing record terminator"));
    }
    cursor += rt.len();
    if cursor != total_len {
        return Err(Error::format(format!(
            "{} stray bytes between the record terminator and the record end",
            total_len - cursor,
        )));
    }

    Ok(IsoRecord {
        status,
        record_type,
        custom_2,
        coding,
        indicator_count,
        identifier_len,
        custom_3,
        len_len,
        pos_len,
        custom_len,
        reserved,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tiny_record_builds_to_known_bytes() {
        let record = IsoRecord::from_pairs([("1", "a")]);
        let bytes = build_record(&record, &IsoConfig::default()).unwrap();
        assert_eq!(bytes, b"000400000000000370004500001000200000#a##".to_vec());
        assert_eq!(parse_record(&bytes, &IsoConfig::default()).unwrap(), record);
    }

    #[test]
    fn empty_record_builds_to_known_bytes() {
        let record = IsoRecord::default();
        let bytes = build_record(&record, &IsoConfig::default()).unwrap();
        assert_eq!(bytes, b"000260000000000250004500##".to_vec());
        assert_eq!(parse_record(&bytes, &IsoConfig::default()).unwrap(), record);
    }

    #[test]
    fn positions_are_prefix_sums() {
        let record = IsoRecord::from_pairs([("10", "test"), ("10", "one"), ("11", "two")]);
        let bytes = build_record(&record, &IsoConfig::default()).unwrap();
        assert_eq!(
            bytes,
            b"000750000000000610004500010000500000010000400005011000400009#test#one#two##"
                .to_vec(),
        );
        let parsed = parse_record(&bytes, &IsoConfig::default()).unwrap();
        assert_eq!(parsed.fields.len(), 3);
        assert_eq!(parsed.fields[0].tag, *b"010");
    }

    #[test]
    fn corrupt_position_is_rejected() {
        let record = IsoRecord::from_pairs([("1", "ab"), ("2", "cd")]);
        let mut bytes = build_record(&record, &IsoConfig::default()).unwrap();
        // Second entry's position lives at offset 24 + 12 + 3 + 4.
        bytes[43] = b'9';
        let err = parse_record(&bytes, &IsoConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Format { .. }), "{err}");
    }

    #[test]
    fn missing_record_terminator_is_rejected() {
        let record = IsoRecord::from_pairs([("1", "a")]);
        let mut bytes = build_record(&record, &IsoConfig::default()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = b'!';
        let err = parse_record(&bytes, &IsoConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn total_len_overflow_is_rejected() {
        let record = IsoRecord::from_pairs([("1", vec![b'x'; 100_000])]);
        assert!(build_record(&record, &IsoConfig::default()).is_err());
    }
}
