//! # ioisis-iso
//!
//! Codec for the ISO 2709 interchange format of the CDS/ISIS family:
//! variable-length records with a fixed-width leader, a directory of
//! tag/length/position triples and concatenated field data, optionally
//! wrapped in fixed-width text lines.
//!
//! ## Quick start
//!
//! ```rust
//! use ioisis_iso::{IsoConfig, IsoReader, IsoRecord, IsoWriter};
//!
//! let record = IsoRecord::from_pairs([("1", "a")]);
//! let mut writer = IsoWriter::new(Vec::new(), IsoConfig::default());
//! writer.write_record(&record)?;
//! let bytes = writer.into_inner();
//! assert_eq!(bytes, b"000400000000000370004500001000200000#a##\n");
//!
//! let mut reader = IsoReader::new(&bytes[..], IsoConfig::default());
//! assert_eq!(reader.read_record()?, Some(record));
//! assert_eq!(reader.read_record()?, None);
//! # Ok::<(), ioisis_iso::Error>(())
//! ```

pub mod codec;
pub mod error;
pub mod line_split;
pub mod record;
pub mod stream;

pub use codec::{build_record, parse_record};
pub use error::{Error, Result};
pub use line_split::{LineSplitReader, LineSplitWriter};
pub use record::{
    IsoConfig, IsoField, IsoRecord, DEFAULT_FIELD_TERMINATOR, DEFAULT_LINE_LEN, DEFAULT_NEWLINE,
    DEFAULT_RECORD_TERMINATOR, LEADER_LEN, TAG_LEN, TOTAL_LEN_LEN,
};
pub use stream::{IsoReader, IsoWriter};
