// src/lib.rs

//! autopatch: unattended OS update installation
//!
//! Searches for, downloads and installs updates, reboots when needed and
//! resumes itself after the restart until no updates remain. Failed
//! installs are retried across a bounded number of reboots.
//!
//! # Architecture
//!
//! - [`provider`]: the external update backend behind the [`UpdateProvider`] trait
//! - [`retry`]: bounded retry for flaky search and download calls
//! - [`filter`]: narrowing update sets by predicate
//! - [`engine`]: the per-pass search/download/install/decide state machine
//! - [`resume`]: the autostart record that survives a reboot
//! - [`driver`]: the outer loop tying it together

pub mod config;
pub mod driver;
pub mod engine;
mod error;
pub mod filter;
pub mod provider;
pub mod reboot;
pub mod resume;
pub mod retry;
pub mod update;

pub use config::Config;
pub use driver::{Driver, RunOutcome};
pub use engine::{decide, DecisionEngine, PassOutcome, RebootReason};
pub use error::{Error, Result};
pub use provider::{CommandProvider, ProviderError, SearchResult, UpdateProvider};
pub use reboot::{CommandRebooter, Rebooter};
pub use resume::{ResumeRecord, ResumeRegistrar, ResumeState, SystemdRegistrar};
pub use retry::RetryPolicy;
pub use update::{OperationResult, OperationResultCode, RetryBudget, Update, UpdateSet};
