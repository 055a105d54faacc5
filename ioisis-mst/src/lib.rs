//! # ioisis-mst
//!
//! Codec for the CDS/ISIS Master File (MST) on-disk format and its
//! cross-reference (XRF) companion, covering the historical dialects:
//! ISIS and FFI addressing widths, packed and unpacked leader and
//! directory alignment, lockable and lock-free MFRL interpretation,
//! both byte orders, and the XRF bit-shift regimes.
//!
//! ## Quick start
//!
//! ```rust
//! use std::io::Cursor;
//! use ioisis_mst::{MstConfig, MstReader, MstRecord, MstWriter};
//!
//! let mut writer = MstWriter::new(Cursor::new(Vec::new()), MstConfig::default())?;
//! writer.write_record(&MstRecord::from_pairs(0, [(70u16, &b"some data"[..])]))?;
//! let build = writer.finish()?;
//!
//! let bytes = build.sink.into_inner();
//! let mut reader = MstReader::new(&bytes[..], MstConfig::default())?;
//! let record = reader.read_record()?.expect("one record");
//! assert_eq!(record.mfn, 1);
//! assert_eq!(record.fields[0], (70, b"some data".to_vec()));
//! # Ok::<(), ioisis_mst::Error>(())
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod ioutils;
pub mod reader;
pub mod record;
pub mod writer;
pub mod xrf;

pub use config::{
    Dialect, Ibp, MstConfig, BLOCK_LEN, DEFAULT_CONTROL_LEN, DEFAULT_MIN_MODULUS, DEFAULT_SHIFT,
};
pub use control::ControlRecord;
pub use error::{Error, Result};
pub use ioutils::Endianness;
pub use reader::MstReader;
pub use record::{MstRecord, RecordStatus};
pub use writer::{MstBuild, MstWriter};
pub use xrf::{build_xrf, parse_xrf, XrfEntry, XrfMap, XRF_BLOCK_ENTRIES};
