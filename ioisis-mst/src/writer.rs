//! Streaming master-file builder.
//!
//! The control record is written first with placeholder allocation
//! state, records stream out one by one, and the control record is
//! rewritten through `seek(0)` once the body size is known; the sink
//! must therefore be seekable. The builder also keeps the
//! block/offset of every record it writes, so the companion XRF file
//! can be produced from the same pass.

use std::io::{Seek, SeekFrom, Write};

use tracing::debug;

use crate::config::{MstConfig, BLOCK_LEN};
use crate::control::ControlRecord;
use crate::error::{Error, Result};
use crate::record::{build_record_bytes, MstRecord};
use crate::xrf::{XrfEntry, XrfMap};

/// Result of a finished build: the sink, the final control record and
/// the cross-reference table of the written records.
pub struct MstBuild<W> {
    pub sink: W,
    pub control: ControlRecord,
    pub xrf: XrfMap,
    /// Effective shift the XRF table should be encoded with.
    pub shift: u8,
}

impl<W> std::fmt::Debug for MstBuild<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MstBuild")
            .field("sink", &"..")
            .field("control", &self.control)
            .field("xrf", &self.xrf)
            .field("shift", &self.shift)
            .finish()
    }
}

/// Streaming builder for a master file.
pub struct MstWriter<W: Write + Seek> {
    sink: W,
    config: MstConfig,
    shift: u8,
    modulus: u32,
    next_mfn: u32,
    position: u64,
    xrf: XrfMap,
}

impl<W: Write + Seek> MstWriter<W> {
    /// Validate the configuration and write the placeholder control
    /// record.
    pub fn new(mut sink: W, config: MstConfig) -> Result<Self> {
        config.validate()?;
        let shift = config.effective_shift(config.default_shift);
        let modulus = config.modulus_for_shift(shift);
        let placeholder = ControlRecord::new(config.default_shift);
        sink.write_all(&placeholder.build(&config)?)?;
        let position = u64::from(config.control_len);
        Ok(Self {
            sink,
            config,
            shift,
            modulus,
            next_mfn: 1,
            position,
            xrf: XrfMap::new(),
        })
    }

    /// Record-alignment modulus of the file being built.
    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// Append one record. A record with MFN 0 is assigned the next
    /// free MFN; an explicit MFN bumps the allocator past it.
    pub fn write_record(&mut self, record: &MstRecord) -> Result<u32> {
        let mfn = if record.mfn > 0 {
            record.mfn
        } else {
            self.next_mfn
        };
        if self.xrf.contains_key(&mfn) {
            return Err(Error::format(format!("duplicate MFN {mfn}")));
        }
        let bumped = mfn
            .checked_add(1)
            .ok_or_else(|| Error::format(format!("MFN {mfn} exhausts the numbering")))?;
        self.next_mfn = self.next_mfn.max(bumped);

        // Never let the leader straddle a block boundary.
        let offset = self.position % BLOCK_LEN;
        if offset + self.config.leader_len() as u64 - 4 > BLOCK_LEN {
            let pad = vec![self.config.block_filler; (BLOCK_LEN - offset) as usize];
            self.sink.write_all(&pad)?;
            self.position += pad.len() as u64;
        }

        let block = (self.position / BLOCK_LEN) as i32 + 1;
        let offset_in_block = (self.position % BLOCK_LEN) as u16;
        let bytes = build_record_bytes(record, mfn, &self.config, self.modulus)?;
        self.sink.write_all(&bytes)?;
        self.position += bytes.len() as u64;
        debug!(mfn, block, offset_in_block, len = bytes.len(), "wrote record");

        self.xrf.insert(
            mfn,
            XrfEntry {
                block: if record.status.is_active() { block } else { -block },
                offset: offset_in_block,
                is_new: false,
                is_updated: false,
            },
        );
        Ok(mfn)
    }

    /// Pad the file to a whole block and rewrite the control record
    /// with the final allocation state.
    pub fn finish(mut self) -> Result<MstBuild<W>> {
        let body_end = self.position;
        let tail = body_end % BLOCK_LEN;
        if tail != 0 {
            let pad = vec![self.config.block_filler; (BLOCK_LEN - tail) as usize];
            self.sink.write_all(&pad)?;
        }

        let control = ControlRecord {
            next_mfn: self.next_mfn,
            next_block: (body_end / BLOCK_LEN) as i32 + 1,
            next_offset: (body_end % BLOCK_LEN) as u16 + 1,
            mftype: 0,
            mstxl: self.config.default_shift,
            reccnt: 0,
            mfcxx1: 0,
            delock_count: 0,
            ewlock: 0,
        };
        self.sink.seek(SeekFrom::Start(0))?;
        self.sink.write_all(&control.build(&self.config)?)?;
        self.sink.flush()?;
        Ok(MstBuild {
            sink: self.sink,
            control,
            xrf: self.xrf,
            shift: self.shift,
        })
    }
}
