//! Error types for packrun.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The orchestrator broke one of its own disciplines (checkpoint stack
    /// underflow, unguarded mutation, a result recorded twice).
    #[error("usage error: {0}")]
    Usage(String),

    #[error("failed to write report to {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate plugin: {0}")]
    DuplicatePlugin(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
