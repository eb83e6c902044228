use std::io;

use thiserror::Error;

use logmerge_core::id::SourceId;
use logmerge_core::timestamp::{Timestamp, TimestampError};

/// Result type local to logmerge-exec.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Every variant is fatal: the merge aborts and the output is left as written so far.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("read error on {source_id} ({name}): {error}")]
    SourceRead {
        source_id: SourceId,
        name: String,
        #[source]
        error: io::Error,
    },

    #[error("sink write failed: {0}")]
    SinkWrite(#[source] logmerge_io::Error),

    #[error("{source_id} line {line_no}: {error}")]
    TimestampParse {
        source_id: SourceId,
        line_no: u64,
        #[source]
        error: TimestampError,
    },

    #[error("{source_id} is out of order at line {line_no}: {timestamp} after {previous}")]
    OutOfOrder {
        source_id: SourceId,
        line_no: u64,
        previous: Timestamp,
        timestamp: Timestamp,
    },

    #[error("expected {expected} sources, got {actual}")]
    SourceCountMismatch { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<logmerge_core::error::Error> for MergeError {
    fn from(e: logmerge_core::error::Error) -> Self {
        use logmerge_core::error::Error as CoreError;
        match e {
            CoreError::Config(msg) => MergeError::Config(msg),
            CoreError::Hash(msg) => MergeError::Invariant(msg),
        }
    }
}
