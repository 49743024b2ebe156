//! Error types for the CLI.

use core_types::VmError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Fatal VM condition (classified by `VmErrorKind`)
    #[error("vm error: {0}")]
    Vm(#[from] VmError),

    /// File I/O error
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The entry argument is not a usable entry point
    #[error("bad entry point: {0}")]
    BadEntryPoint(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
