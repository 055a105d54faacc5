//! The master-file control record.
//!
//! The first `control_len` bytes of an MST file form a pseudo-record
//! with MFN 0 holding the allocation state of the file: the next MFN
//! to assign, the next free block and offset, the XRF shift (MSTXL)
//! and the multi-user lock counters.

use std::io::Cursor;

use crate::config::{MstConfig, CONTROL_CORE_LEN};
use crate::error::{Error, Result};
use crate::ioutils::Endianness;

/// Parsed control record.
///
/// `next_block` and `next_offset` are 1-based, as stored on disk: the
/// next record would start at file offset
/// `(next_block - 1) * 512 + next_offset - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRecord {
    /// Next MFN to assign.
    pub next_mfn: u32,
    /// 1-based block of the first free byte.
    pub next_block: i32,
    /// 1-based offset of the first free byte inside its block.
    pub next_offset: u16,
    /// Master file type (0 for user data files).
    pub mftype: u8,
    /// Stored XRF shift; see [`MstConfig::effective_shift`].
    pub mstxl: u8,
    /// Historical record counter, preserved as found.
    pub reccnt: i32,
    /// Historical field, preserved as found.
    pub mfcxx1: i32,
    /// Data-entry lock counter (MFCXX2).
    pub delock_count: i32,
    /// Exclusive write lock (MFCXX3).
    pub ewlock: i32,
}

impl ControlRecord {
    /// A fresh control record for an empty file.
    pub fn new(mstxl: u8) -> Self {
        Self {
            next_mfn: 1,
            next_block: 1,
            next_offset: 1,
            mftype: 0,
            mstxl,
            reccnt: 0,
            mfcxx1: 0,
            delock_count: 0,
            ewlock: 0,
        }
    }

    /// File offset of the first free byte, derived from the 1-based
    /// block/offset pointer pair.
    pub fn next_position(&self) -> u64 {
        (self.next_block.max(1) as u64 - 1) * 512 + u64::from(self.next_offset.max(1)) - 1
    }

    /// Parse a control record from its on-disk bytes.
    pub fn parse(bytes: &[u8], endianness: Endianness) -> Result<Self> {
        if bytes.len() < CONTROL_CORE_LEN as usize {
            return Err(Error::format(format!(
                "control record of {} bytes is shorter than {CONTROL_CORE_LEN}",
                bytes.len(),
            )));
        }
        let mut cursor = Cursor::new(bytes);
        let ctlmfn = endianness.read_i32(&mut cursor)?;
        if ctlmfn != 0 {
            return Err(Error::format(format!(
                "control record marker is {ctlmfn}, not 0",
            )));
        }
        let next_mfn = endianness.read_i32(&mut cursor)?;
        if next_mfn < 1 {
            return Err(Error::format(format!("next MFN {next_mfn} below 1")));
        }
        let next_block = endianness.read_i32(&mut cursor)?;
        let next_offset = endianness.read_u16(&mut cursor)?;
        // One 16-bit slot holds both MFTYPE and MSTXL; the byte order
        // of the pair follows the file's endianness.
        let type_and_shift = endianness.read_u16(&mut cursor)?;
        let mftype = (type_and_shift >> 8) as u8;
        let mstxl = (type_and_shift & 0xFF) as u8;
        let reccnt = endianness.read_i32(&mut cursor)?;
        let mfcxx1 = endianness.read_i32(&mut cursor)?;
        let delock_count = endianness.read_i32(&mut cursor)?;
        let ewlock = endianness.read_i32(&mut cursor)?;
        Ok(Self {
            next_mfn: next_mfn as u32,
            next_block,
            next_offset,
            mftype,
            mstxl,
            reccnt,
            mfcxx1,
            delock_count,
            ewlock,
        })
    }

    /// Build the on-disk bytes, padded to the configured length with
    /// the control filler.
    pub fn build(&self, config: &MstConfig) -> Result<Vec<u8>> {
        let endianness = config.endianness;
        let mut out = Vec::with_capacity(config.control_len as usize);
        endianness.write_i32(&mut out, 0)?;
        endianness.write_i32(&mut out, self.next_mfn as i32)?;
        endianness.write_i32(&mut out, self.next_block)?;
        endianness.write_u16(&mut out, self.next_offset)?;
        let type_and_shift = (u16::from(self.mftype) << 8) | u16::from(self.mstxl);
        endianness.write_u16(&mut out, type_and_shift)?;
        endianness.write_i32(&mut out, self.reccnt)?;
        endianness.write_i32(&mut out, self.mfcxx1)?;
        endianness.write_i32(&mut out, self.delock_count)?;
        endianness.write_i32(&mut out, self.ewlock)?;
        debug_assert_eq!(out.len(), CONTROL_CORE_LEN as usize);
        out.resize(config.control_len as usize, config.control_filler);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_both_endians() {
        for endianness in [Endianness::Little, Endianness::Big] {
            let config = MstConfig {
                endianness,
                ..MstConfig::default()
            };
            let control = ControlRecord {
                next_mfn: 42,
                next_block: 3,
                next_offset: 129,
                mftype: 0,
                mstxl: 6,
                reccnt: 0,
                mfcxx1: 0,
                delock_count: 2,
                ewlock: 1,
            };
            let bytes = control.build(&config).unwrap();
            assert_eq!(bytes.len(), 64);
            assert_eq!(ControlRecord::parse(&bytes, endianness).unwrap(), control);
        }
    }

    #[test]
    fn shift_byte_position_flips_with_endianness() {
        let control = ControlRecord::new(6);
        let little = control.build(&MstConfig::default()).unwrap();
        assert_eq!(little[14], 6); // mstxl is the low byte, written first
        assert_eq!(little[15], 0);
        let big = control
            .build(&MstConfig {
                endianness: Endianness::Big,
                ..MstConfig::default()
            })
            .unwrap();
        assert_eq!(big[14], 0);
        assert_eq!(big[15], 6);
    }

    #[test]
    fn nonzero_marker_is_rejected() {
        let mut bytes = ControlRecord::new(0).build(&MstConfig::default()).unwrap();
        bytes[0] = 1;
        assert!(ControlRecord::parse(&bytes, Endianness::Little).is_err());
    }

    #[test]
    fn next_position_is_zero_based() {
        let mut control = ControlRecord::new(0);
        control.next_block = 1;
        control.next_offset = 91;
        assert_eq!(control.next_position(), 90);
        control.next_block = 2;
        control.next_offset = 1;
        assert_eq!(control.next_position(), 512);
    }
}
