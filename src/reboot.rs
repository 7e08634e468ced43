// src/reboot.rs

//! Machine restart trigger

use crate::config::RebootConfig;
use crate::error::{Error, Result};
use std::process::Command;
use tracing::info;

/// Something that can restart the machine
pub trait Rebooter {
    /// Request a restart
    ///
    /// Returning `Ok` means the request was accepted; the process is
    /// expected to be terminated by the OS shortly afterwards.
    fn reboot(&mut self) -> Result<()>;
}

/// Restarts the machine by running a configured command
pub struct CommandRebooter {
    command: Vec<String>,
}

impl CommandRebooter {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn from_config(config: &RebootConfig) -> Self {
        Self::new(config.command.clone())
    }
}

impl Rebooter for CommandRebooter {
    fn reboot(&mut self) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::Reboot("empty reboot command".to_string()))?;

        info!("Running {}", self.command.join(" "));
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| Error::Reboot(format!("failed to run '{}': {}", program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Reboot(format!(
                "'{}' exited with code {}",
                program,
                status.code().unwrap_or(-1)
            )))
        }
    }
}
