//! Master-file configuration: dialects, locking, alignment, fillers.

use crate::error::{Error, Result};
use crate::ioutils::Endianness;

/// Default XRF shift (MSTXL) for newly built files.
pub const DEFAULT_SHIFT: u8 = 6;
/// Default minimum record-alignment modulus (the ISIS WORD alignment).
pub const DEFAULT_MIN_MODULUS: u32 = 2;
/// Default control record length.
pub const DEFAULT_CONTROL_LEN: u32 = 64;
/// Default filler for the control record tail.
pub const DEFAULT_CONTROL_FILLER: u8 = 0x00;
/// Default filler for leader/directory alignment slack.
pub const DEFAULT_SLACK_FILLER: u8 = 0x00;
/// Default filler for trailing recordless block bytes.
pub const DEFAULT_BLOCK_FILLER: u8 = 0x00;
/// Default filler for trailing record bytes.
pub const DEFAULT_RECORD_FILLER: u8 = 0x20;
/// Size of a master-file block.
pub const BLOCK_LEN: u64 = 512;
/// Fixed width of the meaningful control-record core.
pub const CONTROL_CORE_LEN: u32 = 32;

/// Leader and directory addressing width: 16-bit (`Isis`) or 32-bit
/// (`Ffi`) position, length and base fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Isis,
    Ffi,
}

impl std::str::FromStr for Dialect {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "isis" => Ok(Self::Isis),
            "ffi" => Ok(Self::Ffi),
            other => Err(Error::config(format!("unknown format {other:?}"))),
        }
    }
}

/// What to do with invalid block padding found while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ibp {
    /// Fail with [`Error::InvalidBlockPadding`](crate::Error::InvalidBlockPadding).
    #[default]
    Check,
    /// Skip ahead one modulus at a time until a record parses.
    Ignore,
    /// Like `Ignore`, but attach the skipped bytes to the previous
    /// record.
    Store,
}

impl std::str::FromStr for Ibp {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "check" => Ok(Self::Check),
            "ignore" => Ok(Self::Ignore),
            "store" => Ok(Self::Store),
            other => Err(Error::config(format!("unknown ibp policy {other:?}"))),
        }
    }
}

/// Every tunable of the master-file layout, validated at use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MstConfig {
    /// Byte order of all integer fields.
    pub endianness: Endianness,
    /// Addressing width dialect.
    pub format: Dialect,
    /// Multi-user locking: the MFRL sign is the record lock flag, and
    /// MFCXX2/MFCXX3 are lock counters. Off, MFRL is unsigned.
    pub lockable: bool,
    /// MSTXL to write into new files.
    pub default_shift: u8,
    /// Legacy interpretation where MSTXL=4 means a 3-bit shift.
    pub shift4is3: bool,
    /// Smallest record-alignment modulus.
    pub min_modulus: u32,
    /// Without alignment slack in leaders and FFI directories when
    /// `true`; with the 2-byte slacks when `false`.
    pub packed: bool,
    /// Control record length (at least 32, multiple of the modulus).
    pub control_len: u32,
    /// Filler for the control record tail.
    pub control_filler: u8,
    /// Filler for leader/directory alignment slack.
    pub slack_filler: u8,
    /// Filler for trailing recordless block bytes.
    pub block_filler: u8,
    /// Filler for trailing record bytes.
    pub record_filler: u8,
    /// Invalid-block-padding policy on read.
    pub ibp: Ibp,
}

impl Default for MstConfig {
    fn default() -> Self {
        Self {
            endianness: Endianness::Little,
            format: Dialect::Isis,
            lockable: true,
            default_shift: DEFAULT_SHIFT,
            shift4is3: true,
            min_modulus: DEFAULT_MIN_MODULUS,
            packed: false,
            control_len: DEFAULT_CONTROL_LEN,
            control_filler: DEFAULT_CONTROL_FILLER,
            slack_filler: DEFAULT_SLACK_FILLER,
            block_filler: DEFAULT_BLOCK_FILLER,
            record_filler: DEFAULT_RECORD_FILLER,
            ibp: Ibp::Check,
        }
    }
}

impl MstConfig {
    /// Apply the legacy MSTXL=4 remap to a stored shift value.
    pub fn effective_shift(&self, mstxl: u8) -> u8 {
        if self.shift4is3 && mstxl == 4 { 3 } else { mstxl }
    }

    /// Record-alignment modulus for a given effective shift.
    pub fn modulus_for_shift(&self, shift: u8) -> u32 {
        self.min_modulus.max(1u32 << shift)
    }

    /// Leader width for this dialect and packing.
    pub fn leader_len(&self) -> usize {
        match (self.format, self.packed) {
            (Dialect::Isis, true) => 18,
            (Dialect::Isis, false) => 20,
            (Dialect::Ffi, true) => 22,
            (Dialect::Ffi, false) => 24,
        }
    }

    /// Directory entry width for this dialect and packing.
    pub fn dir_entry_len(&self) -> usize {
        match (self.format, self.packed) {
            (Dialect::Isis, _) => 6,
            (Dialect::Ffi, true) => 10,
            (Dialect::Ffi, false) => 12,
        }
    }

    /// Largest total record length the MFRL field can represent.
    pub fn max_record_len(&self) -> u64 {
        match (self.format, self.lockable) {
            (Dialect::Isis, true) => i16::MAX as u64,
            (Dialect::Isis, false) => u16::MAX as u64,
            (Dialect::Ffi, true) => i32::MAX as u64,
            (Dialect::Ffi, false) => u32::MAX as u64,
        }
    }

    /// Check option consistency against an effective shift.
    pub fn validate_for_shift(&self, shift: u8) -> Result<()> {
        if !self.min_modulus.is_power_of_two() {
            return Err(Error::config(format!(
                "min modulus {} is not a power of two",
                self.min_modulus,
            )));
        }
        if shift > 9 {
            return Err(Error::config(format!(
                "shift {shift} leaves no room for block offsets",
            )));
        }
        if self.control_len < CONTROL_CORE_LEN {
            return Err(Error::config(format!(
                "control length {} is shorter than {CONTROL_CORE_LEN}",
                self.control_len,
            )));
        }
        let modulus = self.modulus_for_shift(shift);
        if self.control_len % modulus != 0 {
            return Err(Error::config(format!(
                "control length {} is not a multiple of the modulus {modulus}",
                self.control_len,
            )));
        }
        Ok(())
    }

    /// Check option consistency with the configured default shift.
    pub fn validate(&self) -> Result<()> {
        self.validate_for_shift(self.effective_shift(self.default_shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_and_directory_widths() {
        let mut config = MstConfig::default();
        assert_eq!(config.leader_len(), 20);
        assert_eq!(config.dir_entry_len(), 6);
        config.packed = true;
        assert_eq!(config.leader_len(), 18);
        config.format = Dialect::Ffi;
        assert_eq!(config.leader_len(), 22);
        assert_eq!(config.dir_entry_len(), 10);
        config.packed = false;
        assert_eq!(config.leader_len(), 24);
        assert_eq!(config.dir_entry_len(), 12);
    }

    #[test]
    fn shift4is3_remap() {
        let config = MstConfig::default();
        assert_eq!(config.effective_shift(4), 3);
        assert_eq!(config.effective_shift(6), 6);
        let literal = MstConfig {
            shift4is3: false,
            ..MstConfig::default()
        };
        assert_eq!(literal.effective_shift(4), 4);
    }

    #[test]
    fn validation_rejects_bad_combinations() {
        let bad_modulus = MstConfig {
            min_modulus: 3,
            ..MstConfig::default()
        };
        assert!(bad_modulus.validate().is_err());

        let bad_control = MstConfig {
            control_len: 33,
            default_shift: 0,
            ..MstConfig::default()
        };
        assert!(bad_control.validate().is_err());

        let short_control = MstConfig {
            control_len: 16,
            default_shift: 0,
            min_modulus: 1,
            ..MstConfig::default()
        };
        assert!(short_control.validate().is_err());

        let bad_shift = MstConfig {
            default_shift: 10,
            control_len: 1024,
            ..MstConfig::default()
        };
        assert!(bad_shift.validate().is_err());

        assert!(MstConfig::default().validate().is_ok());
    }
}
