//! # ioisis-fields
//!
//! Field-level utilities shared by the ISIS codecs: subfield
//! splitting/joining, printf-like field-tag templates, tidy-list and
//! record-shape conversions, and the text-encoding layer (including a
//! hybrid decoder for legacy files with embedded UTF-8).
//!
//! ## Quick start
//!
//! ```rust
//! use ioisis_fields::subfield::{SubfieldConfig, SubfieldParser};
//!
//! let sfp = SubfieldParser::new(SubfieldConfig {
//!     first: b"_".to_vec(),
//!     ..SubfieldConfig::default()
//! });
//! let pairs = sfp.parse(b"data^ttext");
//! assert_eq!(pairs[1], (b"t".to_vec(), b"text".to_vec()));
//! ```

pub mod encoding;
pub mod error;
pub mod record;
pub mod subfield;
pub mod tag_format;

pub use encoding::{hybrid_utf8_decode, TextCodec, DEFAULT_RECORD_ENCODING};
pub use error::{Error, Result};
pub use record::{tl_to_value, value_to_tl, Mode, TidyList, IBP_TAG, MFN_TAG, STATUS_TAG};
pub use subfield::{SubfieldConfig, SubfieldPairs, SubfieldParser};
pub use tag_format::{FieldTagFormatter, ScannedTag, DEFAULT_FTF_TEMPLATE};
