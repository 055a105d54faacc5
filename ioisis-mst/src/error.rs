//! Error types for the MST/XRF codecs

use thiserror::Error;

/// Result type for MST/XRF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or building master files
#[derive(Error, Debug)]
pub enum Error {
    /// A structural invariant of the file layout is violated
    #[error("malformed master file: {reason}")]
    Format { reason: String },

    /// Non-filler bytes found in a block pad under the `check` policy
    #[error("invalid block padding at file offset {offset}")]
    InvalidBlockPadding { offset: u64 },

    /// A record carries a non-zero backward pointer, meaning the file
    /// has a pending reorganization this codec does not follow
    #[error("record {mfn} has a pending reorganization (non-zero backward pointer)")]
    PendingReorganization { mfn: u32 },

    /// The stream ended inside a record
    #[error("unexpected end of stream inside a record")]
    UnexpectedEof,

    /// An impossible combination of master-file options
    #[error("invalid master file configuration: {reason}")]
    Configuration { reason: String },

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

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
