//! Master-file record model and its per-dialect leader and directory
//! codecs.

use std::io::Cursor;

use crate::config::{Dialect, MstConfig};
use crate::error::{Error, Result};

/// Record status as stored in the leader's status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordStatus {
    #[default]
    Active,
    LogicallyDeleted,
}

impl RecordStatus {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    pub(crate) fn as_word(self) -> u16 {
        match self {
            Self::Active => 0,
            Self::LogicallyDeleted => 1,
        }
    }

    pub(crate) fn from_word(word: u16) -> Result<Self> {
        match word {
            0 => Ok(Self::Active),
            1 => Ok(Self::LogicallyDeleted),
            other => Err(Error::format(format!("unknown record status {other}"))),
        }
    }
}

/// One master-file record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MstRecord {
    /// Master File Number; 0 asks the builder to assign the next one.
    pub mfn: u32,
    pub status: RecordStatus,
    /// Record lock flag (the MFRL sign in lockable files).
    pub rlock: bool,
    /// `(tag, value)` pairs in directory order.
    pub fields: Vec<(u16, Vec<u8>)>,
    /// Invalid-block-padding residue attached under the `store`
    /// policy; empty otherwise.
    pub ibp: Vec<u8>,
}

impl MstRecord {
    /// Build an active record from `(tag, value)` pairs.
    pub fn from_pairs<V: Into<Vec<u8>>>(
        mfn: u32,
        pairs: impl IntoIterator<Item = (u16, V)>,
    ) -> Self {
        Self {
            mfn,
            fields: pairs
                .into_iter()
                .map(|(tag, value)| (tag, value.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Stored invalid-block-padding residue as hex, if any.
    pub fn ibp_hex(&self) -> Option<String> {
        if self.ibp.is_empty() {
            None
        } else {
            Some(hex::encode(&self.ibp))
        }
    }
}

/// The fixed-width leader of one record, as read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Leader {
    pub mfn: i32,
    pub total_len: u64,
    pub rlock: bool,
    pub old_block: i32,
    pub old_offset: u16,
    pub base_addr: u64,
    pub num_fields: u16,
    pub status_word: u16,
}

/// Parse a leader from exactly `config.leader_len()` bytes.
pub(crate) fn parse_leader(bytes: &[u8], config: &MstConfig) -> Result<Leader> {
    debug_assert_eq!(bytes.len(), config.leader_len());
    let endianness = config.endianness;
    let mut cursor = Cursor::new(bytes);

    let mfn = endianness.read_i32(&mut cursor)?;
    let (total_len, rlock) = match (config.format, config.lockable) {
        (Dialect::Isis, true) => {
            let mfrl = endianness.read_i16(&mut cursor)?;
            if mfrl == i16::MIN {
                return Err(Error::format("MFRL is -32768"));
            }
            (u64::from(mfrl.unsigned_abs()), mfrl < 0)
        }
        (Dialect::Isis, false) => (u64::from(endianness.read_u16(&mut cursor)?), false),
        (Dialect::Ffi, true) => {
            let mfrl = endianness.read_i32(&mut cursor)?;
            if mfrl == i32::MIN {
                return Err(Error::format("MFRL is -2147483648"));
            }
            (u64::from(mfrl.unsigned_abs()), mfrl < 0)
        }
        (Dialect::Ffi, false) => (u64::from(endianness.read_u32(&mut cursor)?), false),
    };
    if config.format == Dialect::Isis && !config.packed {
        cursor.set_position(cursor.position() + 2);
    }
    let old_block = endianness.read_i32(&mut cursor)?;
    let old_offset = endianness.read_u16(&mut cursor)?;
    if config.format == Dialect::Ffi && !config.packed {
        cursor.set_position(cursor.position() + 2);
    }
    let base_addr = match config.format {
        Dialect::Isis => u64::from(endianness.read_u16(&mut cursor)?),
        Dialect::Ffi => u64::from(endianness.read_u32(&mut cursor)?),
    };
    let num_fields = endianness.read_u16(&mut cursor)?;
    let status_word = endianness.read_u16(&mut cursor)?;
    debug_assert_eq!(cursor.position() as usize, config.leader_len());

    Ok(Leader {
        mfn,
        total_len,
        rlock,
        old_block,
        old_offset,
        base_addr,
        num_fields,
        status_word,
    })
}

/// Validate a leader's structural invariants against the modulus.
pub(crate) fn validate_leader(leader: &Leader, config: &MstConfig, modulus: u32) -> Result<()> {
    if leader.mfn < 1 {
        return Err(Error::format(format!("MFN {} below 1", leader.mfn)));
    }
    if leader.old_block != 0 || leader.old_offset != 0 {
        return Err(Error::PendingReorganization {
            mfn: leader.mfn as u32,
        });
    }
    let leader_len = config.leader_len() as u64;
    let expected_base = leader_len + leader.num_fields as u64 * config.dir_entry_len() as u64;
    if leader.base_addr != expected_base {
        return Err(Error::format(format!(
            "base address {} does not match {} directory entries (expected {expected_base})",
            leader.base_addr, leader.num_fields,
        )));
    }
    if leader.total_len < leader.base_addr {
        return Err(Error::format(format!(
            "record length {} shorter than its base address {}",
            leader.total_len, leader.base_addr,
        )));
    }
    if leader.total_len % u64::from(modulus) != 0 {
        return Err(Error::format(format!(
            "record length {} is not a multiple of the modulus {modulus}",
            leader.total_len,
        )));
    }
    Ok(())
}

/// Parse the directory and field area: `body` holds the record bytes
/// after the leader, trailing padding included.
pub(crate) fn parse_body(
    leader: &Leader,
    body: &[u8],
    config: &MstConfig,
) -> Result<Vec<(u16, Vec<u8>)>> {
    let endianness = config.endianness;
    let num_fields = usize::from(leader.num_fields);
    let dir_len = num_fields * config.dir_entry_len();
    let mut cursor = Cursor::new(&body[..dir_len.min(body.len())]);

    let mut entries = Vec::with_capacity(num_fields);
    let mut expected_pos = 0u64;
    for _ in 0..num_fields {
        let tag = endianness.read_u16(&mut cursor).map_err(|_| Error::UnexpectedEof)?;
        if config.format == Dialect::Ffi && !config.packed {
            cursor.set_position(cursor.position() + 2);
        }
        let (pos, len) = match config.format {
            Dialect::Isis => (
                u64::from(endianness.read_u16(&mut cursor).map_err(|_| Error::UnexpectedEof)?),
                u64::from(endianness.read_u16(&mut cursor).map_err(|_| Error::UnexpectedEof)?),
            ),
            Dialect::Ffi => (
                u64::from(endianness.read_u32(&mut cursor).map_err(|_| Error::UnexpectedEof)?),
                u64::from(endianness.read_u32(&mut cursor).map_err(|_| Error::UnexpectedEof)?),
            ),
        };
        if pos != expected_pos {
            return Err(Error::format(format!(
                "directory position {pos} where {expected_pos} was expected",
            )));
        }
        expected_pos += len;
        entries.push((tag, pos, len));
    }

    let data_area = &body[dir_len..];
    let mut fields = Vec::with_capacity(num_fields);
    for (tag, pos, len) in entries {
        let end = pos + len;
        if end > data_area.len() as u64 {
            return Err(Error::format(format!(
                "field at {pos}+{len} extends past the record end",
            )));
        }
        fields.push((tag, data_area[pos as usize..end as usize].to_vec()));
    }
    Ok(fields)
}

/// Build the on-disk bytes of one record, padded to the modulus.
pub(crate) fn build_record_bytes(
    record: &MstRecord,
    mfn: u32,
    config: &MstConfig,
    modulus: u32,
) -> Result<Vec<u8>> {
    let endianness = config.endianness;
    if mfn == 0 || mfn > i32::MAX as u32 {
        return Err(Error::format(format!("MFN {mfn} out of range")));
    }
    if record.fields.len() > usize::from(u16::MAX) {
        return Err(Error::format(format!("{} fields exceed NVF", record.fields.len())));
    }

    let leader_len = config.leader_len() as u64;
    let dir_len = record.fields.len() as u64 * config.dir_entry_len() as u64;
    let base_addr = leader_len + dir_len;
    let data_len: u64 = record.fields.iter().map(|(_, value)| value.len() as u64).sum();
    let unpadded = base_addr + data_len;
    let total_len = unpadded.div_ceil(u64::from(modulus)) * u64::from(modulus);
    if total_len > config.max_record_len() {
        return Err(Error::format(format!(
            "record of {total_len} bytes exceeds the MFRL limit {}",
            config.max_record_len(),
        )));
    }
    if config.format == Dialect::Isis && base_addr > u64::from(u16::MAX) {
        return Err(Error::format(format!("base address {base_addr} exceeds 16 bits")));
    }

    let mut out = Vec::with_capacity(total_len as usize);
    endianness.write_i32(&mut out, mfn as i32)?;
    match (config.format, config.lockable) {
        (Dialect::Isis, true) => {
            let mut mfrl = total_len as i16;
            if record.rlock {
                mfrl = -mfrl;
            }
            endianness.write_i16(&mut out, mfrl)?;
        }
        (Dialect::Isis, false) => endianness.write_u16(&mut out, total_len as u16)?,
        (Dialect::Ffi, true) => {
            let mut mfrl = total_len as i32;
            if record.rlock {
                mfrl = -mfrl;
            }
            endianness.write_i32(&mut out, mfrl)?;
        }
        (Dialect::Ffi, false) => endianness.write_u32(&mut out, total_len as u32)?,
    }
    if config.format == Dialect::Isis && !config.packed {
        out.extend_from_slice(&[config.slack_filler; 2]);
    }
    endianness.write_i32(&mut out, 0)?;
    endianness.write_u16(&mut out, 0)?;
    if config.format == Dialect::Ffi && !config.packed {
        out.extend_from_slice(&[config.slack_filler; 2]);
    }
    match config.format {
        Dialect::Isis => endianness.write_u16(&mut out, base_addr as u16)?,
        Dialect::Ffi => endianness.write_u32(&mut out, base_addr as u32)?,
    }
    endianness.write_u16(&mut out, record.fields.len() as u16)?;
    endianness.write_u16(&mut out, record.status.as_word())?;
    debug_assert_eq!(out.len() as u64, leader_len);

    let mut pos = 0u64;
    for (tag, value) in &record.fields {
        endianness.write_u16(&mut out, *tag)?;
        if config.format == Dialect::Ffi && !config.packed {
            out.extend_from_slice(&[config.slack_filler; 2]);
        }
        match config.format {
            Dialect::Isis => {
                endianness.write_u16(&mut out, pos as u16)?;
                endianness.write_u16(&mut out, value.len() as u16)?;
            }
            Dialect::Ffi => {
                endianness.write_u32(&mut out, pos as u32)?;
                endianness.write_u32(&mut out, value.len() as u32)?;
            }
        }
        pos += value.len() as u64;
    }
    for (_, value) in &record.fields {
        out.extend_from_slice(value);
    }
    out.resize(total_len as usize, config.record_filler);
    Ok(out)
}
