//! Error types for the ISO 2709 codec

use thiserror::Error;

/// Result type for ISO 2709 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or building ISO 2709 records
#[derive(Error, Debug)]
pub enum Error {
    /// A structural invariant of the record layout is violated
    #[error("malformed ISO record: {reason}")]
    Format { reason: String },

    /// The line-split wrapper saw a wrong or missing newline
    #[error("line split mismatch at logical offset {offset}")]
    LineSplit { offset: u64 },

    /// The stream ended inside a record
    #[error("unexpected end of stream inside a record")]
    UnexpectedEof,

    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }
}
