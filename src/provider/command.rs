// src/provider/command.rs

//! Provider backed by an external helper program
//!
//! The helper is invoked once per operation and answers with a single JSON
//! document on stdout:
//!
//! - `search <criteria>` -> `{"result_code": "Succeeded", "updates": [...]}`
//! - `download <id>...` -> `{"result_code": "Succeeded"}`
//! - `install <id>...` -> `{"result_code": "Succeeded", "reboot_required": false}`
//! - `status <id>...` -> `{"result_code": "Succeeded", "updates": [...]}`
//!
//! Anything else (spawn failure, timeout, non-zero exit, unparsable JSON)
//! is a [`ProviderError`].

use super::{ProviderError, SearchResult, UpdateProvider};
use crate::config::ProviderConfig;
use crate::update::{OperationResult, OperationResultCode, UpdateSet};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    result_code: OperationResultCode,
    #[serde(default)]
    updates: UpdateSet,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    result_code: OperationResultCode,
}

/// Update provider that shells out to a helper executable
pub struct CommandProvider {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProvider {
    /// Create a provider for `program` with the given per-call timeout
    pub fn new(program: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Create a provider from the `[provider]` config section
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(&config.program, config.timeout).with_args(config.args.clone())
    }

    /// Arguments placed before the verb on every invocation
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Run one helper invocation and decode its JSON answer
    fn invoke<T: DeserializeOwned>(
        &self,
        verb: &'static str,
        operands: &[&str],
    ) -> Result<T, ProviderError> {
        debug!("Running provider {} with {} operand(s)", verb, operands.len());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(verb)
            .args(operands)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProviderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // Drain both pipes while waiting so a large answer cannot fill the
        // pipe buffer and stall the helper
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                // The readers are detached, not joined: a grandchild of the
                // helper may keep the pipes open for as long as it runs.
                // Each reader exits once the last writer closes its end.
                return Err(ProviderError::Timeout {
                    verb,
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;
        let stderr = String::from_utf8_lossy(&stderr);
        for line in stderr.lines() {
            warn!("[provider {}] {}", verb, line);
        }

        if !status.success() {
            return Err(ProviderError::ExitStatus {
                verb,
                code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        serde_json::from_slice(&stdout).map_err(|e| ProviderError::Protocol {
            verb,
            reason: e.to_string(),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("pipe reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}

impl UpdateProvider for CommandProvider {
    fn search(&mut self, criteria: &str) -> Result<SearchResult, ProviderError> {
        let response: UpdatesResponse = self.invoke("search", &[criteria])?;
        Ok(SearchResult {
            result_code: response.result_code,
            updates: response.updates,
        })
    }

    fn download(&mut self, updates: &UpdateSet) -> Result<OperationResult, ProviderError> {
        let response: DownloadResponse = self.invoke("download", &updates.ids())?;
        Ok(OperationResult::new(response.result_code, false))
    }

    fn install(&mut self, updates: &UpdateSet) -> Result<OperationResult, ProviderError> {
        self.invoke("install", &updates.ids())
    }

    fn refresh(&mut self, updates: &UpdateSet) -> Result<UpdateSet, ProviderError> {
        let response: UpdatesResponse = self.invoke("status", &updates.ids())?;
        if response.result_code == OperationResultCode::Failed {
            return Err(ProviderError::Protocol {
                verb: "status",
                reason: "status query reported Failed".to_string(),
            });
        }
        Ok(response.updates)
    }
}
