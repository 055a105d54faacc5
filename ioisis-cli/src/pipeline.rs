//! Glue between the codec record types and the tidy-list model.

use anyhow::{anyhow, Context, Result};

use ioisis_fields::{FieldTagFormatter, TidyList, IBP_TAG, MFN_TAG, STATUS_TAG};
use ioisis_iso::{IsoField, IsoRecord};
use ioisis_mst::{MstRecord, RecordStatus};

fn is_synthetic(tag: &str) -> bool {
    matches!(tag, MFN_TAG | STATUS_TAG | IBP_TAG)
}

/// Turn a parsed ISO record into a tidy list. ISO 2709 has no MFN, so
/// the 1-based stream ordinal stands in for it.
pub fn iso_record_to_tl(
    record: &IsoRecord,
    ordinal: u64,
    ftf: &FieldTagFormatter,
    prepend_mfn: bool,
    prepend_status: bool,
) -> Result<TidyList> {
    let mut tl = TidyList::new();
    if prepend_mfn {
        tl.push((MFN_TAG.to_string(), ordinal.to_string().into_bytes()));
    }
    if prepend_status {
        let status = if record.is_active() { "0" } else { "1" };
        tl.push((STATUS_TAG.to_string(), status.as_bytes().to_vec()));
    }
    for (index, field) in record.fields.iter().enumerate() {
        let raw = String::from_utf8_lossy(&field.tag);
        tl.push((ftf.render(&raw, index)?, field.value.clone()));
    }
    Ok(tl)
}

/// Turn a parsed master-file record into a tidy list.
pub fn mst_record_to_tl(
    record: &MstRecord,
    ftf: &FieldTagFormatter,
    prepend_mfn: bool,
    prepend_status: bool,
) -> Result<TidyList> {
    let mut tl = TidyList::new();
    if prepend_mfn {
        tl.push((MFN_TAG.to_string(), record.mfn.to_string().into_bytes()));
    }
    if prepend_status {
        let status = if record.status.is_active() { "0" } else { "1" };
        tl.push((STATUS_TAG.to_string(), status.as_bytes().to_vec()));
    }
    for (index, (tag, value)) in record.fields.iter().enumerate() {
        tl.push((ftf.render(&tag.to_string(), index)?, value.clone()));
    }
    if let Some(residue) = record.ibp_hex() {
        tl.push((IBP_TAG.to_string(), residue.into_bytes()));
    }
    Ok(tl)
}

fn status_from_pair(value: &[u8]) -> bool {
    value.first() == Some(&b'1')
}

fn scan_tag(ftf: &FieldTagFormatter, tag: &str) -> Result<String> {
    ftf.scan(tag)?
        .raw_tag
        .ok_or_else(|| anyhow!("tag template {tag:?} captures no tag"))
}

/// Build an ISO record from a tidy list. Synthetic `mfn`/`ibp` pairs
/// are dropped (ISO has neither); a `status` pair sets the leader's
/// status byte.
pub fn tl_to_iso_record(tl: &TidyList, ftf: &FieldTagFormatter) -> Result<IsoRecord> {
    let mut record = IsoRecord::default();
    for (tag, value) in tl {
        if is_synthetic(tag) {
            if tag == STATUS_TAG && status_from_pair(value) {
                record.status = b'1';
            }
            continue;
        }
        let raw = scan_tag(ftf, tag)?;
        record.fields.push(IsoField::new(raw.as_bytes(), value.clone()));
    }
    Ok(record)
}

/// Build a master-file record from a tidy list. A leading `mfn` pair
/// sets the explicit MFN (0 lets the builder assign one); a `status`
/// pair sets the deletion flag; `ibp` residue is not written back.
pub fn tl_to_mst_record(tl: &TidyList, ftf: &FieldTagFormatter) -> Result<MstRecord> {
    let mut record = MstRecord::default();
    for (tag, value) in tl {
        if is_synthetic(tag) {
            if tag == MFN_TAG {
                record.mfn = std::str::from_utf8(value)
                    .ok()
                    .and_then(|text| text.trim().parse().ok())
                    .ok_or_else(|| anyhow!("mfn {:?} is not a number", String::from_utf8_lossy(value)))?;
            } else if tag == STATUS_TAG && status_from_pair(value) {
                record.status = RecordStatus::LogicallyDeleted;
            }
            continue;
        }
        let raw = scan_tag(ftf, tag)?;
        let tag_number: u16 = raw
            .parse()
            .with_context(|| format!("tag {raw:?} is not a 16-bit number"))?;
        record.fields.push((tag_number, value.clone()));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ftf(int_tags: bool) -> FieldTagFormatter {
        FieldTagFormatter::new("%z", int_tags).unwrap()
    }

    #[test]
    fn iso_tags_are_zero_stripped_and_refilled() {
        let record = IsoRecord::from_pairs([("000", "data"), ("010", "more")]);
        let tl = iso_record_to_tl(&record, 1, &ftf(false), false, false).unwrap();
        assert_eq!(
            tl,
            vec![
                ("0".to_string(), b"data".to_vec()),
                ("10".to_string(), b"more".to_vec()),
            ],
        );
        assert_eq!(tl_to_iso_record(&tl, &ftf(false)).unwrap(), record);
    }

    #[test]
    fn mst_round_trip_keeps_mfn_and_status() {
        let record = MstRecord {
            status: RecordStatus::LogicallyDeleted,
            ..MstRecord::from_pairs(9, [(70u16, &b"value"[..])])
        };
        let tl = mst_record_to_tl(&record, &ftf(true), true, true).unwrap();
        assert_eq!(
            tl,
            vec![
                ("mfn".to_string(), b"9".to_vec()),
                ("status".to_string(), b"1".to_vec()),
                ("70".to_string(), b"value".to_vec()),
            ],
        );
        assert_eq!(tl_to_mst_record(&tl, &ftf(true)).unwrap(), record);
    }

    #[test]
    fn ibp_residue_is_reported_but_not_rebuilt() {
        let record = MstRecord {
            ibp: vec![0xAB, 0xCD],
            ..MstRecord::from_pairs(1, [(1u16, &b"x"[..])])
        };
        let tl = mst_record_to_tl(&record, &ftf(true), false, false).unwrap();
        assert_eq!(tl.last().unwrap(), &("ibp".to_string(), b"abcd".to_vec()));
        let rebuilt = tl_to_mst_record(&tl, &ftf(true)).unwrap();
        assert!(rebuilt.ibp.is_empty());
    }
}
