//! Data-format errors raised while reading and matching trace events

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a trace pass
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Malformed event at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error(
        "Timestamps out of order: {name} at {timestamp_ns}ns follows an event at {previous_ns}ns"
    )]
    OutOfOrder {
        name: String,
        timestamp_ns: u64,
        previous_ns: u64,
    },

    #[error("Cannot detect trace format of {0}")]
    UnknownFormat(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TraceError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        TraceError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type for trace decoding and extraction
pub type Result<T> = std::result::Result<T, TraceError>;
