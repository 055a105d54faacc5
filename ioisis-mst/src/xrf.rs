//! The cross-reference (XRF) file: one bit-packed pointer per MFN.
//!
//! An XRF file is a sequence of 512-byte blocks: a signed 32-bit block
//! index (negative only on the last block) followed by 127 packed
//! 32-bit entries. Entry `i` of block `b` is the pointer for MFN
//! `(b - 1) * 127 + i + 1`. Within an entry, from the most significant
//! bit down: a signed block number of `21 + shift` bits, the `is_new`
//! and `is_updated` flags, and a `9 - shift`-bit offset stored
//! right-shifted by `shift`.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::ioutils::Endianness;

/// Entries per XRF block.
pub const XRF_BLOCK_ENTRIES: usize = 127;

/// One decoded cross-reference pointer.
///
/// `block` is 1-based and negative for logically deleted records;
/// `offset` is the 0-based byte offset inside the 512-byte block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XrfEntry {
    pub block: i32,
    pub offset: u16,
    pub is_new: bool,
    pub is_updated: bool,
}

/// MFN to pointer mapping; all-zero slots are omitted.
pub type XrfMap = BTreeMap<u32, XrfEntry>;

fn check_shift(shift: u8) -> Result<()> {
    if shift > 9 {
        return Err(Error::config(format!(
            "shift {shift} leaves no room for block offsets",
        )));
    }
    Ok(())
}

impl XrfEntry {
    fn unpack(word: u32, shift: u8) -> Self {
        let flag_bits = 11 - u32::from(shift);
        let offset_bits = flag_bits - 2;
        Self {
            block: (word as i32) >> flag_bits,
            offset: (((word & ((1 << offset_bits) - 1)) << shift) & 0x1FF) as u16,
            is_new: (word >> (flag_bits - 1)) & 1 == 1,
            is_updated: (word >> offset_bits) & 1 == 1,
        }
    }

    fn pack(self, shift: u8) -> Result<u32> {
        let flag_bits = 11 - u32::from(shift);
        let offset_bits = flag_bits - 2;
        if self.offset & ((1 << shift) - 1) != 0 {
            return Err(Error::format(format!(
                "offset {} is not a multiple of the {shift}-bit shift",
                self.offset,
            )));
        }
        let stored_offset = u32::from(self.offset) >> shift;
        if stored_offset >= 1 << offset_bits {
            return Err(Error::format(format!("offset {} out of range", self.offset)));
        }
        let block_bits = 21 + u32::from(shift);
        let limit = 1i64 << (block_bits - 1);
        if i64::from(self.block) < -limit || i64::from(self.block) >= limit {
            return Err(Error::format(format!("block {} out of range", self.block)));
        }
        Ok(((self.block as u32) << flag_bits)
            | (u32::from(self.is_new) << (flag_bits - 1))
            | (u32::from(self.is_updated) << offset_bits)
            | stored_offset)
    }

    fn is_zero(self) -> bool {
        self == Self::default()
    }
}

/// Decode a whole XRF file into its MFN-to-pointer mapping.
pub fn parse_xrf(mut reader: impl Read, endianness: Endianness, shift: u8) -> Result<XrfMap> {
    check_shift(shift)?;
    let mut map = XrfMap::new();
    let mut block_no = 1i32;
    loop {
        let index = endianness.read_i32(&mut reader).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::format("cross-reference file ends without a final block")
            } else {
                Error::Io(e)
            }
        })?;
        if index.abs() != block_no {
            return Err(Error::format(format!(
                "cross-reference block index {index} where ±{block_no} was expected",
            )));
        }
        for slot in 0..XRF_BLOCK_ENTRIES {
            let word = endianness
                .read_u32(&mut reader)
                .map_err(|_| Error::UnexpectedEof)?;
            if word != 0 {
                let mfn = (block_no as u32 - 1) * XRF_BLOCK_ENTRIES as u32 + slot as u32 + 1;
                map.insert(mfn, XrfEntry::unpack(word, shift));
            }
        }
        if index < 0 {
            let mut probe = [0u8; 1];
            if reader.read(&mut probe)? != 0 {
                return Err(Error::format(
                    "trailing bytes after the final cross-reference block",
                ));
            }
            return Ok(map);
        }
        block_no += 1;
    }
}

/// Encode an MFN-to-pointer mapping as a whole XRF file.
///
/// Entries are laid out in MFN order, missing MFNs become all-zero
/// slots, and the final (possibly only) block carries the negative
/// index.
pub fn build_xrf(
    map: &XrfMap,
    endianness: Endianness,
    shift: u8,
    mut writer: impl Write,
) -> Result<()> {
    check_shift(shift)?;
    if map.keys().next() == Some(&0) {
        return Err(Error::format("MFN 0 cannot appear in a cross-reference file"));
    }
    let max_mfn = map.keys().next_back().copied().unwrap_or(0);
    let blocks = (u64::from(max_mfn).div_ceil(XRF_BLOCK_ENTRIES as u64)).max(1);
    for block_no in 1..=blocks {
        let index = if block_no == blocks {
            -(block_no as i32)
        } else {
            block_no as i32
        };
        endianness.write_i32(&mut writer, index)?;
        for slot in 0..XRF_BLOCK_ENTRIES as u64 {
            let mfn = ((block_no - 1) * XRF_BLOCK_ENTRIES as u64 + slot + 1) as u32;
            let word = match map.get(&mfn) {
                Some(entry) if !entry.is_zero() => entry.pack(shift)?,
                _ => 0,
            };
            endianness.write_u32(&mut writer, word)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(shift: u8) -> XrfMap {
        let step = 1u16 << shift;
        XrfMap::from([
            (
                1,
                XrfEntry {
                    block: 1,
                    offset: step,
                    is_new: true,
                    is_updated: false,
                },
            ),
            (
                2,
                XrfEntry {
                    block: -3,
                    offset: 0,
                    is_new: false,
                    is_updated: true,
                },
            ),
            (
                200,
                XrfEntry {
                    block: 7,
                    offset: step * 2,
                    is_new: false,
                    is_updated: false,
                },
            ),
        ])
    }

    #[test]
    fn round_trips_across_shifts_and_endians() {
        for shift in [0u8, 3, 4, 6] {
            for endianness in [Endianness::Little, Endianness::Big] {
                let map = sample(shift);
                let mut bytes = Vec::new();
                build_xrf(&map, endianness, shift, &mut bytes).unwrap();
                // MFN 200 needs a second block.
                assert_eq!(bytes.len(), 2 * (4 + 4 * XRF_BLOCK_ENTRIES));
                assert_eq!(parse_xrf(&bytes[..], endianness, shift).unwrap(), map);
            }
        }
    }

    #[test]
    fn last_block_index_is_negative() {
        let map = XrfMap::from([(1, XrfEntry { block: 1, offset: 64, ..XrfEntry::default() })]);
        let mut bytes = Vec::new();
        build_xrf(&map, Endianness::Little, 6, &mut bytes).unwrap();
        assert_eq!(&bytes[..4], &(-1i32).to_le_bytes());
    }

    #[test]
    fn block_count_boundary_at_127_entries() {
        let entry = XrfEntry {
            block: 1,
            offset: 0,
            ..XrfEntry::default()
        };
        let exactly_one_block: XrfMap = (1..=127).map(|mfn| (mfn, entry)).collect();
        let mut bytes = Vec::new();
        build_xrf(&exactly_one_block, Endianness::Little, 0, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 4 + 4 * XRF_BLOCK_ENTRIES);

        let two_blocks: XrfMap = (1..=128).map(|mfn| (mfn, entry)).collect();
        bytes.clear();
        build_xrf(&two_blocks, Endianness::Little, 0, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 2 * (4 + 4 * XRF_BLOCK_ENTRIES));
    }

    #[test]
    fn empty_map_still_emits_one_final_block() {
        let mut bytes = Vec::new();
        build_xrf(&XrfMap::new(), Endianness::Little, 0, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 4 + 4 * XRF_BLOCK_ENTRIES);
        assert_eq!(&bytes[..4], &(-1i32).to_le_bytes());
        assert_eq!(parse_xrf(&bytes[..], Endianness::Little, 0).unwrap(), XrfMap::new());
    }

    #[test]
    fn zero_slots_are_omitted_on_parse() {
        let map = XrfMap::from([(5, XrfEntry { block: 2, offset: 128, ..XrfEntry::default() })]);
        let mut bytes = Vec::new();
        build_xrf(&map, Endianness::Little, 0, &mut bytes).unwrap();
        let parsed = parse_xrf(&bytes[..], Endianness::Little, 0).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key(&5));
    }

    #[test]
    fn unaligned_offset_is_rejected() {
        let entry = XrfEntry {
            block: 1,
            offset: 3,
            ..XrfEntry::default()
        };
        assert!(entry.pack(6).is_err());
        assert!(entry.pack(0).is_ok());
    }

    #[test]
    fn known_word_layout_at_shift_zero() {
        // block 1, new, not updated, offset 26:
        // 1 << 11 | 1 << 10 | 26 = 0x00000C1A.
        let entry = XrfEntry {
            block: 1,
            offset: 26,
            is_new: true,
            is_updated: false,
        };
        assert_eq!(entry.pack(0).unwrap(), 0x0000_0C1A);
        assert_eq!(XrfEntry::unpack(0x0000_0C1A, 0), entry);
    }

    #[test]
    fn negative_block_survives_packing() {
        let entry = XrfEntry {
            block: -1,
            offset: 0,
            is_new: false,
            is_updated: false,
        };
        let word = entry.pack(0).unwrap();
        assert_eq!(XrfEntry::unpack(word, 0), entry);
    }

    #[test]
    fn wrong_block_index_is_rejected() {
        let mut bytes = Vec::new();
        build_xrf(&XrfMap::new(), Endianness::Little, 0, &mut bytes).unwrap();
        bytes[0] = 2;
        assert!(parse_xrf(&bytes[..], Endianness::Little, 0).is_err());
    }
}
