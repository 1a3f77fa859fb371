use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building, reading or querying partition indexes.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The bytes are not a partition index (bad signature, bad count, bad UTF-8).
    #[error("invalid partition index format: {reason}")]
    Format { reason: String },

    /// The stream ended before the header or all records could be read.
    #[error("partition index truncated while reading {context}")]
    Truncated { context: &'static str },

    /// The partition file does not exist.
    #[error("no index file for partition {code}")]
    NotFound { code: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Fingerprint derivation failed; the partition build is aborted.
    #[error("fingerprint derivation failed: {reason}")]
    Derivation { reason: String },

    #[error("invalid partition code '{code}': expected two ASCII letters")]
    InvalidPartitionCode { code: String },

    #[error("record {ibge_code} belongs to partition {found}, not {expected}")]
    PartitionMismatch {
        expected: String,
        found: String,
        ibge_code: String,
    },

    #[error("malformed input at line {line}: {reason}")]
    Ingest { line: usize, reason: String },
}

impl IndexError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that mean "no data" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
