//! Error types for the field, subfield and record-shape layers

use thiserror::Error;

/// Result type for field-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while splitting fields, formatting tags or
/// reshaping records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A subfield key is shorter than the configured key length
    #[error("invalid subfield key {key:?}: shorter than the configured key length {length}")]
    InvalidSubfieldKey { key: String, length: usize },

    /// Unparsing the subfield pairs produced a field that parses back
    /// to something else
    #[error("unparsed subfields do not reproduce the source pairs")]
    SubfieldRoundTripMismatch,

    /// Two occurrences of the same template specifier captured
    /// different values
    #[error("tag template captures disagree: {left:?} vs {right:?}")]
    AmbiguousTagTemplate { left: String, right: String },

    /// The tag template itself cannot be compiled
    #[error("invalid tag template: {reason}")]
    InvalidTagTemplate { reason: String },

    /// A tag does not fit the compiled template
    #[error("tag {tag:?} does not match the tag template")]
    TagMismatch { tag: String },

    /// A record value has the wrong JSON shape for the requested mode
    #[error("invalid record for mode {mode}: {reason}")]
    InvalidRecord { mode: String, reason: String },

    /// The encoding label is not recognized
    #[error("unknown encoding label {label:?}")]
    UnknownEncoding { label: String },

    /// Bytes or text cannot be converted under the requested encoding
    #[error("data is not convertible under encoding {encoding}")]
    Encoding { encoding: String },
}
