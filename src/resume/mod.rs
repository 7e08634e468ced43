// src/resume/mod.rs

//! Resume state across reboots
//!
//! The process has no notion of suspending. Before a reboot it registers a
//! launch command with an OS autostart mechanism; after the restart a fresh
//! instance starts from that command with the remaining retry budget.
//! The record is removed once a pass finds no updates.

pub mod systemd;

pub use systemd::SystemdRegistrar;

use crate::error::Result;
use crate::update::RetryBudget;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Command line flag carrying the retry budget
pub const RETRIES_FLAG: &str = "--retries-on-reboot";

/// Persistent autostart store holding a single launch command
pub trait ResumeRegistrar {
    /// Store `launch_command`, replacing any earlier one
    fn register(&mut self, launch_command: &str) -> Result<()>;

    /// Remove the stored command; succeeds when nothing is stored
    fn unregister(&mut self) -> Result<()>;

    /// The stored command, if any
    fn registered_command(&self) -> Result<Option<String>>;

    fn is_registered(&self) -> Result<bool> {
        Ok(self.registered_command()?.is_some())
    }
}

/// Launch command plus the retry budget it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeRecord {
    pub command: String,
    pub retry_budget: RetryBudget,
}

impl ResumeRecord {
    /// Build the record that relaunches `program` with `retry_budget`
    pub fn new(program: &Path, retry_budget: RetryBudget) -> Self {
        let command = format!(
            "\"{}\" {}={}",
            program.display(),
            RETRIES_FLAG,
            retry_budget.remaining()
        );
        Self {
            command,
            retry_budget,
        }
    }

    /// Recover a record from a stored launch command
    pub fn parse(command: &str) -> Option<Self> {
        let budget = command
            .split_whitespace()
            .find_map(|arg| arg.strip_prefix(RETRIES_FLAG)?.strip_prefix('='))?
            .parse()
            .ok()?;

        Some(Self {
            command: command.to_string(),
            retry_budget: RetryBudget::new(budget),
        })
    }
}

/// Writes and clears the resume record for this program
pub struct ResumeState<'a> {
    registrar: &'a mut dyn ResumeRegistrar,
    program: PathBuf,
}

impl<'a> ResumeState<'a> {
    /// `program` is the executable the autostart entry will relaunch
    pub fn new(registrar: &'a mut dyn ResumeRegistrar, program: impl Into<PathBuf>) -> Self {
        Self {
            registrar,
            program: program.into(),
        }
    }

    /// Register a relaunch with `retry_budget`, overwriting any earlier record
    pub fn persist(&mut self, retry_budget: RetryBudget) -> Result<ResumeRecord> {
        let record = ResumeRecord::new(&self.program, retry_budget);
        self.registrar.register(&record.command)?;
        info!("Registered resume command: {}", record.command);
        Ok(record)
    }

    /// Remove the record; no-op when none exists
    pub fn clear(&mut self) -> Result<()> {
        if self.registrar.is_registered()? {
            info!("Removing resume command");
        } else {
            debug!("No resume command registered");
        }
        self.registrar.unregister()
    }

    /// The record currently registered, if any
    pub fn current(&self) -> Result<Option<ResumeRecord>> {
        Ok(self
            .registrar
            .registered_command()?
            .as_deref()
            .and_then(ResumeRecord::parse))
    }
}
