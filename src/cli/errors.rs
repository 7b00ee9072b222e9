//! CLI-specific error types
//!
//! Every command failure maps to one stable code, written to stdout as an
//! error response.

use std::io;

use thiserror::Error;

use crate::audit::AuditError;
use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::store::StoreError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Request body missing or not valid JSON
    #[error("invalid input: {0}")]
    Input(String),

    /// stdin/stdout failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    pub fn input(msg: impl Into<String>) -> Self {
        CliError::Input(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(e) => e.code(),
            CliError::Gateway(e) => e.code(),
            CliError::Store(e) => e.code(),
            CliError::Audit(e) => e.code(),
            CliError::Input(_) => "CRM_CLI_INVALID_INPUT",
            CliError::Io(_) => "CRM_CLI_IO",
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::input(format!("JSON error: {}", e))
    }
}
