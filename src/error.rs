//! Error types for portgate.
//!
//! Each concern defines its own `thiserror` enum next to the code that
//! raises it. `CliError` gathers the fatal ones for the command-line front
//! end, where every one of them ends the process with exit code 1.

use crate::auth::AuthorizationError;
use crate::config::ConfigError;
use crate::types::{PortSpecError, ResolveError};
use thiserror::Error;

/// Fatal errors surfaced by the scan command.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("SECURITY VIOLATION: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    PortSpec(#[from] PortSpecError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
