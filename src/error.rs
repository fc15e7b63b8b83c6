//! Error taxonomy for the classification pipeline.
//!
//! Only `BufferAllocation` is fatal. Every other variant is recovered by the
//! cycle that produced it: malformed crops skip the frame, classifier failures
//! degrade the run to motion fallback, log failures are reported and ignored.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("failed to append alert log {}: {source}", path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("frame window allocation failed: {0}")]
    BufferAllocation(String),
}

impl WatchError {
    /// True for errors that must stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WatchError::BufferAllocation(_))
    }
}
