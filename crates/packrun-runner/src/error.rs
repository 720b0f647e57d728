//! Runner error types.

use packrun_config::ConfigError;
use thiserror::Error;

/// Errors that abort a run. Plugin failures and faults never end up here.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Core(#[from] packrun_core::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
