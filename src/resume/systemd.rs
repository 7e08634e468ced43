// src/resume/systemd.rs

//! systemd-backed resume registrar
//!
//! The resume record is a oneshot service unit whose `ExecStart=` is the
//! launch command. It is enabled by symlinking it into the boot target's
//! `.wants` directory, the same thing `systemctl enable` does, so nothing
//! has to talk to a running systemd and the unit simply starts on the next
//! boot. Environment the relaunched instance needs (such as a custom
//! config path) is recorded as `Environment=` lines.

use super::ResumeRegistrar;
use crate::config::ResumeConfig;
use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Registrar storing the launch command in a systemd unit
pub struct SystemdRegistrar {
    unit_dir: PathBuf,
    unit_name: String,
    wanted_by: String,
    environment: Vec<(String, String)>,
}

impl SystemdRegistrar {
    pub fn new(
        unit_dir: impl Into<PathBuf>,
        unit_name: impl Into<String>,
        wanted_by: impl Into<String>,
    ) -> Self {
        Self {
            unit_dir: unit_dir.into(),
            unit_name: unit_name.into(),
            wanted_by: wanted_by.into(),
            environment: Vec::new(),
        }
    }

    /// Set `key=value` in the relaunched instance's environment
    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.push((key.into(), value.into()));
        self
    }

    pub fn from_config(config: &ResumeConfig) -> Self {
        Self::new(&config.unit_dir, &config.unit_name, &config.wanted_by)
    }

    /// Path of the unit file
    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(&self.unit_name)
    }

    /// Path of the enablement symlink
    pub fn wants_link(&self) -> PathBuf {
        self.unit_dir
            .join(format!("{}.wants", self.wanted_by))
            .join(&self.unit_name)
    }

    /// Environment recorded in the installed unit
    pub fn registered_environment(&self) -> Result<Vec<(String, String)>> {
        let content = match fs::read_to_string(self.unit_path()) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter_map(|line| line.trim().strip_prefix("Environment="))
            .filter_map(|quoted| {
                let assignment = unquote(quoted)?;
                let (key, value) = assignment.split_once('=')?;
                Some((key.to_string(), value.to_string()))
            })
            .collect())
    }

    fn render_unit(&self, launch_command: &str) -> String {
        let environment: String = self
            .environment
            .iter()
            .map(|(key, value)| {
                format!("Environment={}\n", quote(&format!("{}={}", key, value)))
            })
            .collect();

        format!(
            "[Unit]\n\
             Description=Resume unattended update installation\n\
             After=network-online.target\n\
             Wants=network-online.target\n\
             \n\
             [Service]\n\
             Type=oneshot\n\
             {}\
             ExecStart={}\n\
             \n\
             [Install]\n\
             WantedBy={}\n",
            environment,
            escape_specifiers(launch_command),
            self.wanted_by
        )
    }
}

impl ResumeRegistrar for SystemdRegistrar {
    fn register(&mut self, launch_command: &str) -> Result<()> {
        fs::create_dir_all(&self.unit_dir).map_err(|e| {
            Error::Registrar(format!(
                "failed to create {}: {}",
                self.unit_dir.display(),
                e
            ))
        })?;

        // Write next to the unit and rename so a crash never leaves half a unit
        let unit_path = self.unit_path();
        let staging = self.unit_dir.join(format!(".{}.tmp", self.unit_name));
        fs::write(&staging, self.render_unit(launch_command))?;
        fs::rename(&staging, &unit_path).map_err(|e| {
            Error::Registrar(format!("failed to install {}: {}", unit_path.display(), e))
        })?;
        debug!("Wrote resume unit {}", unit_path.display());

        let link = self.wants_link();
        if fs::symlink_metadata(&link).is_err() {
            if let Some(parent) = link.parent() {
                fs::create_dir_all(parent)?;
            }
            unix_fs::symlink(&unit_path, &link).map_err(|e| {
                Error::Registrar(format!(
                    "failed to create symlink {} -> {}: {}",
                    link.display(),
                    unit_path.display(),
                    e
                ))
            })?;
            debug!("Created symlink: {} -> {}", link.display(), unit_path.display());
        }

        Ok(())
    }

    fn unregister(&mut self) -> Result<()> {
        remove_if_present(&self.wants_link())?;
        remove_if_present(&self.unit_path())?;
        Ok(())
    }

    fn registered_command(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(self.unit_path()) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .find_map(|line| line.trim().strip_prefix("ExecStart="))
            .map(unescape_specifiers))
    }

    fn is_registered(&self) -> Result<bool> {
        Ok(self.unit_path().exists())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Registrar(format!(
            "failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// `%` starts a systemd specifier in `ExecStart=`
fn escape_specifiers(command: &str) -> String {
    command.replace('%', "%%")
}

fn unescape_specifiers(command: &str) -> String {
    command.replace("%%", "%")
}

/// Double-quote an `Environment=` assignment so spaces survive
fn quote(assignment: &str) -> String {
    let escaped = escape_specifiers(assignment)
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn unquote(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(chars.next()?);
        } else {
            out.push(c);
        }
    }
    Some(unescape_specifiers(&out))
}
