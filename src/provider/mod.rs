// src/provider/mod.rs

//! Update provider capability
//!
//! The provider is the external backend that finds, downloads and installs
//! updates. Every call may fail with a [`ProviderError`], which is a
//! communication-level failure and distinct from a `Failed` result code
//! reported by the backend itself.
//!
//! A provider is acquired once per run and passed by `&mut` to the
//! components that need it; it is released when the run's scope ends.

pub mod command;

pub use command::CommandProvider;

use crate::update::{OperationResult, OperationResultCode, UpdateSet};
use thiserror::Error;

/// Transient, communication-level provider failure
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The backend could not be started
    #[error("failed to start provider '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend did not answer in time
    #[error("provider {verb} timed out after {seconds} seconds")]
    Timeout { verb: &'static str, seconds: u64 },

    /// The backend exited unsuccessfully
    #[error("provider {verb} exited with code {code}: {stderr}")]
    ExitStatus {
        verb: &'static str,
        code: i32,
        stderr: String,
    },

    /// The backend answered with something we could not understand
    #[error("malformed provider response to {verb}: {reason}")]
    Protocol { verb: &'static str, reason: String },

    /// Any other backend failure
    #[error("provider error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Outcome of a search: a result code and the updates found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub result_code: OperationResultCode,
    pub updates: UpdateSet,
}

impl SearchResult {
    /// Synthetic failed search with no updates
    pub fn failed() -> Self {
        Self {
            result_code: OperationResultCode::Failed,
            updates: UpdateSet::new(),
        }
    }
}

/// Backend able to search for, download and install updates
pub trait UpdateProvider {
    /// Find updates matching `criteria`
    fn search(&mut self, criteria: &str) -> Result<SearchResult, ProviderError>;

    /// Fetch payloads for `updates`
    fn download(&mut self, updates: &UpdateSet) -> Result<OperationResult, ProviderError>;

    /// Install `updates`; the only call with side effects on the system
    fn install(&mut self, updates: &UpdateSet) -> Result<OperationResult, ProviderError>;

    /// Current metadata for previously seen updates
    ///
    /// Snapshots do not observe later provider calls, so the engine uses
    /// this after a download to see which payloads actually arrived.
    fn refresh(&mut self, updates: &UpdateSet) -> Result<UpdateSet, ProviderError>;
}
