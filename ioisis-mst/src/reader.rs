//! Streaming master-file reader.
//!
//! Records are scanned strictly forward: the control record first,
//! then one record per modulus-aligned slot, skipping block-boundary
//! padding. What happens when the scanner lands on bytes that are not
//! a record is governed by the invalid-block-padding policy.

use std::io::Read;

use tracing::{debug, warn};

use crate::config::{Ibp, MstConfig, BLOCK_LEN};
use crate::control::ControlRecord;
use crate::error::{Error, Result};
use crate::ioutils::ProbeReader;
use crate::record::{parse_body, parse_leader, validate_leader, MstRecord, RecordStatus};

/// Pull-based reader over a master file.
pub struct MstReader<R: Read> {
    probe: ProbeReader<R>,
    config: MstConfig,
    control: ControlRecord,
    shift: u8,
    modulus: u32,
    /// Record held back one step so `store`-mode residue can be
    /// attached to it.
    pending: Option<MstRecord>,
    residue: Vec<u8>,
    last_record_end: u64,
    max_mfn: u32,
    finished: bool,
}

impl<R: Read> MstReader<R> {
    /// Read and validate the control record, deriving the shift and
    /// modulus the rest of the file is laid out with.
    pub fn new(inner: R, config: MstConfig) -> Result<Self> {
        let mut probe = ProbeReader::new(inner);
        let mut control_bytes = vec![0u8; config.control_len as usize];
        probe.read_exact(&mut control_bytes)?;
        let control = ControlRecord::parse(&control_bytes, config.endianness)?;
        let shift = config.effective_shift(control.mstxl);
        config.validate_for_shift(shift)?;
        let modulus = config.modulus_for_shift(shift);
        debug!(shift, modulus, next_mfn = control.next_mfn, "opened master file");
        let last_record_end = u64::from(config.control_len);
        Ok(Self {
            probe,
            config,
            control,
            shift,
            modulus,
            pending: None,
            residue: Vec::new(),
            last_record_end,
            max_mfn: 0,
            finished: false,
        })
    }

    /// The file's control record.
    pub fn control(&self) -> &ControlRecord {
        &self.control
    }

    /// Effective XRF shift of this file.
    pub fn shift(&self) -> u8 {
        self.shift
    }

    /// Record-alignment modulus of this file.
    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// Skip to the next block boundary when the leader would straddle
    /// it, validating the pad under the `check` policy.
    fn skip_block_alignment(&mut self) -> Result<()> {
        let offset = self.probe.position() % BLOCK_LEN;
        if offset + self.config.leader_len() as u64 - 4 > BLOCK_LEN {
            let start = self.probe.position();
            let pad = self.probe.read_up_to((BLOCK_LEN - offset) as usize)?;
            if self.config.ibp == Ibp::Check {
                if let Some(bad) = pad.iter().position(|b| *b != self.config.block_filler) {
                    return Err(Error::InvalidBlockPadding {
                        offset: start + bad as u64,
                    });
                }
            }
        }
        Ok(())
    }

    /// Try to parse a record at the cursor without consuming anything
    /// on failure. `Ok(None)` means the bytes at the cursor are not a
    /// record (padding, residue, or a truncated tail under a lenient
    /// policy).
    fn try_record(&mut self) -> Result<Option<MstRecord>> {
        let strict = self.config.ibp == Ibp::Check;
        let leader_len = self.config.leader_len();

        let head = self.probe.peek(4)?;
        if head.len() < 4 {
            return Ok(None);
        }
        let mut mfn_bytes = &head[..4];
        let mfn = self.config.endianness.read_i32(&mut mfn_bytes)?;
        if mfn < 1 {
            return Ok(None);
        }

        let head = self.probe.peek(leader_len)?;
        if head.len() < leader_len {
            return if strict { Err(Error::UnexpectedEof) } else { Ok(None) };
        }
        let leader = match parse_leader(&head[..leader_len], &self.config) {
            Ok(leader) => leader,
            Err(e) if strict => return Err(e),
            Err(_) => return Ok(None),
        };
        match validate_leader(&leader, &self.config, self.modulus) {
            Ok(()) => {}
            // A backward pointer is a property of a real record, not
            // of padding; it always stops the scan.
            Err(e @ Error::PendingReorganization { .. }) => return Err(e),
            Err(e) if strict => return Err(e),
            Err(_) => return Ok(None),
        }

        let total_len = leader.total_len as usize;
        let whole = self.probe.peek(total_len)?;
        if whole.len() < total_len {
            return if strict { Err(Error::UnexpectedEof) } else { Ok(None) };
        }
        let fields = match parse_body(&leader, &whole[leader_len..], &self.config) {
            Ok(fields) => fields,
            Err(e) if strict => return Err(e),
            Err(_) => return Ok(None),
        };
        let status = match RecordStatus::from_word(leader.status_word) {
            Ok(status) => status,
            Err(e) if strict => return Err(e),
            Err(_) => return Ok(None),
        };

        self.probe.consume(total_len);
        self.max_mfn = self.max_mfn.max(leader.mfn as u32);
        self.last_record_end = self.probe.position();
        Ok(Some(MstRecord {
            mfn: leader.mfn as u32,
            status,
            rlock: leader.rlock,
            fields,
            ibp: Vec::new(),
        }))
    }

    /// Advance over non-record bytes per the IBP policy. Returns
    /// `false` once the end of the stream is reached.
    fn handle_padding(&mut self) -> Result<bool> {
        match self.config.ibp {
            Ibp::Check => {
                // Only trailing block padding may remain.
                let mut scanned = 0u64;
                let start = self.probe.position();
                loop {
                    let chunk = self.probe.read_up_to(4096)?;
                    if chunk.is_empty() {
                        return Ok(false);
                    }
                    if let Some(bad) = chunk.iter().position(|b| *b != self.config.block_filler)
                    {
                        return Err(Error::InvalidBlockPadding {
                            offset: start + scanned + bad as u64,
                        });
                    }
                    scanned += chunk.len() as u64;
                }
            }
            Ibp::Ignore => {
                let skipped = self.probe.read_up_to(self.modulus as usize)?;
                Ok(!skipped.is_empty())
            }
            Ibp::Store => {
                let skipped = self.probe.read_up_to(self.modulus as usize)?;
                if skipped.is_empty() {
                    return Ok(false);
                }
                self.residue.extend_from_slice(&skipped);
                Ok(true)
            }
        }
    }

    /// End-of-stream bookkeeping: residue disposal and the control
    /// record cross-checks.
    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        if !self.residue.is_empty() {
            if self.residue.iter().all(|b| *b == self.config.block_filler) {
                // Ordinary trailing block padding.
                self.residue.clear();
            } else if let Some(previous) = self.pending.as_mut() {
                previous.ibp = std::mem::take(&mut self.residue);
            } else {
                warn!(
                    bytes = self.residue.len(),
                    "residue before the first record has no record to ride on",
                );
                self.residue.clear();
            }
        }

        let expected_next_mfn = self.max_mfn + 1;
        let stored_end = self.control.next_position();
        if self.control.next_mfn < expected_next_mfn || stored_end != self.last_record_end {
            let complaint = format!(
                "control record points at MFN {} / offset {stored_end}, \
                 but the records end at MFN {} / offset {}",
                self.control.next_mfn, self.max_mfn, self.last_record_end,
            );
            if self.config.ibp == Ibp::Check {
                return Err(Error::format(complaint));
            }
            warn!("{complaint}");
        }
        Ok(())
    }

    /// Read the next record, or `None` at a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<MstRecord>> {
        loop {
            if self.finished {
                return Ok(self.pending.take());
            }
            self.skip_block_alignment()?;
            if let Some(record) = self.try_record()? {
                if self.config.ibp != Ibp::Store {
                    return Ok(Some(record));
                }
                // Residue found since the previous record belongs to
                // that record, which can now be released.
                let mut ready = self.pending.replace(record);
                if !self.residue.is_empty() {
                    match ready.as_mut() {
                        Some(previous) => previous.ibp = std::mem::take(&mut self.residue),
                        None => {
                            warn!("residue before the first record has no record to ride on");
                            self.residue.clear();
                        }
                    }
                }
                if let Some(ready) = ready {
                    return Ok(Some(ready));
                }
            } else if !self.handle_padding()? {
                self.finish()?;
                return Ok(self.pending.take());
            }
        }
    }
}

impl<R: Read> Iterator for MstReader<R> {
    type Item = Result<MstRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                self.pending = None;
                Some(Err(e))
            }
        }
    }
}
