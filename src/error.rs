// src/error.rs

//! Crate-wide error type
//!
//! Provider communication failures are deliberately not part of this enum:
//! they are absorbed by the retry wrapper and the decision engine and
//! surface only as result codes.

use crate::update::OperationResultCode;
use thiserror::Error;

/// Result type for autopatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can halt an update run
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while touching the registrar store or config
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config file parsed but contains an invalid value
    #[error("invalid config: {0}")]
    Config(String),

    /// Resume record could not be written or removed
    #[error("resume registrar error: {0}")]
    Registrar(String),

    /// Reboot could not be requested
    #[error("reboot failed: {0}")]
    Reboot(String),

    /// Install failed and no reboot retries remain
    #[error("install finished with {result_code} and no reboot retries remain")]
    RetriesExhausted { result_code: OperationResultCode },
}
