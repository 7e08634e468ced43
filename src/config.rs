// src/config.rs

//! Runtime configuration
//!
//! Loaded once at startup from TOML and passed by reference into the
//! engine, retry wrapper and driver. Every key is optional; a missing
//! config file yields the defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default location of the config file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/autopatch/autopatch.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`]
pub const CONFIG_ENV: &str = "AUTOPATCH_CONFIG";

/// Search criteria: not installed, software updates, not hidden
pub const DEFAULT_SEARCH_CRITERIA: &str = "IsInstalled=0 and Type='Software' and IsHidden=0";

const DEFAULT_MAX_ATTEMPTS: u32 = 30;
const DEFAULT_RETRY_DELAY_SECS: u64 = 30;
const DEFAULT_REBOOT_DELAY_SECS: u64 = 5;
const DEFAULT_PROVIDER_PROGRAM: &str = "/usr/libexec/autopatch/update-provider";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 2 * 3600;
const DEFAULT_UNIT_NAME: &str = "autopatch-resume.service";
const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";
const DEFAULT_WANTED_BY: &str = "multi-user.target";

/// Validated configuration used by the rest of the crate
#[derive(Debug, Clone)]
pub struct Config {
    /// Criteria passed to every provider search
    pub search_criteria: String,

    /// Attempts made for a flaky search or download before giving up
    pub max_attempts: u32,

    /// Pause between failed attempts
    pub retry_delay: Duration,

    /// Pause before requesting a reboot so logs and unit files reach disk
    pub reboot_delay: Duration,

    pub provider: ProviderConfig,
    pub resume: ResumeConfig,
    pub reboot: RebootConfig,
}

/// Settings for the command-backed update provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Helper executable implementing the provider protocol
    pub program: PathBuf,

    /// Arguments placed before the operation verb
    pub args: Vec<String>,

    /// Upper bound on a single helper invocation
    pub timeout: Duration,
}

/// Settings for the systemd resume registrar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeConfig {
    /// Fixed identifier of the resume record
    pub unit_name: String,

    /// Directory holding the unit file
    pub unit_dir: PathBuf,

    /// Target whose `.wants` directory enables the unit at boot
    pub wanted_by: String,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            unit_name: DEFAULT_UNIT_NAME.to_string(),
            unit_dir: PathBuf::from(DEFAULT_UNIT_DIR),
            wanted_by: DEFAULT_WANTED_BY.to_string(),
        }
    }
}

/// How to restart the machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebootConfig {
    /// Program and arguments
    pub command: Vec<String>,
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            command: vec!["systemctl".to_string(), "reboot".to_string()],
        }
    }
}

/// On-disk shape of the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    search_criteria: String,
    max_attempts: u32,
    retry_delay: String,
    reboot_delay: String,
    provider: ProviderSection,
    resume: ResumeConfig,
    reboot: RebootConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ProviderSection {
    program: PathBuf,
    args: Vec<String>,
    timeout: String,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROVIDER_PROGRAM),
            args: Vec::new(),
            timeout: format!("{}s", DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            search_criteria: DEFAULT_SEARCH_CRITERIA.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: format!("{}s", DEFAULT_RETRY_DELAY_SECS),
            reboot_delay: format!("{}s", DEFAULT_REBOOT_DELAY_SECS),
            provider: ProviderSection::default(),
            resume: ResumeConfig::default(),
            reboot: RebootConfig::default(),
        }
    }
}

impl Config {
    /// Validate the raw file contents
    fn from_file(file: ConfigFile) -> Result<Self> {
        if file.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if file.reboot.command.is_empty() {
            return Err(Error::Config("reboot.command must not be empty".to_string()));
        }
        if file.resume.unit_name.is_empty() || file.resume.unit_name.contains('/') {
            return Err(Error::Config(format!(
                "invalid resume.unit_name: '{}'",
                file.resume.unit_name
            )));
        }

        Ok(Self {
            search_criteria: file.search_criteria,
            max_attempts: file.max_attempts,
            retry_delay: parse_duration(&file.retry_delay)?,
            reboot_delay: parse_duration(&file.reboot_delay)?,
            provider: ProviderConfig {
                program: file.provider.program,
                args: file.provider.args,
                timeout: parse_duration(&file.provider.timeout)?,
            },
            resume: file.resume,
            reboot: file.reboot,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        // Same constants as ConfigFile::default, already in parsed form
        let file = ConfigFile::default();
        Self {
            search_criteria: file.search_criteria,
            max_attempts: file.max_attempts,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            reboot_delay: Duration::from_secs(DEFAULT_REBOOT_DELAY_SECS),
            provider: ProviderConfig {
                program: file.provider.program,
                args: file.provider.args,
                timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            },
            resume: file.resume,
            reboot: file.reboot,
        }
    }
}

impl Config {
    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Self::from_file(file)
    }

    /// Load config from `path`, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Config path from the environment, or the default location
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

/// Parse a duration string like "30s", "5m", "2h", "1d"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Duration::from_secs(0));
    }

    let unit_len = s.chars().last().map_or(0, char::len_utf8);
    let (num_str, unit) = s.split_at(s.len() - unit_len);
    let num: u64 = num_str
        .parse()
        .map_err(|_| Error::Config(format!("Invalid duration number: {}", num_str)))?;

    let multiplier: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return Err(Error::Config(format!("Invalid duration unit: {}", unit))),
    };
    let seconds = num
        .checked_mul(multiplier)
        .ok_or_else(|| Error::Config(format!("Duration too large: {}", s)))?;

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("").unwrap(), Duration::ZERO);
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("abcs").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        let huge = format!("{}d", u64::MAX / 86400 + 1);
        assert!(matches!(parse_duration(&huge), Err(Error::Config(_))));
        assert!(parse_duration(&format!("{}s", u64::MAX)).is_ok());
    }

    #[test]
    fn test_empty_toml_matches_defaults() {
        let config = Config::from_toml("").unwrap();
        let defaults = Config::default();

        assert_eq!(config.search_criteria, DEFAULT_SEARCH_CRITERIA);
        assert_eq!(config.search_criteria, defaults.search_criteria);
        assert_eq!(config.max_attempts, 30);
        assert_eq!(config.max_attempts, defaults.max_attempts);
        assert_eq!(config.retry_delay, Duration::from_secs(30));
        assert_eq!(config.retry_delay, defaults.retry_delay);
        assert_eq!(config.reboot_delay, Duration::from_secs(5));
        assert_eq!(config.reboot_delay, defaults.reboot_delay);
        assert_eq!(config.provider.program, defaults.provider.program);
        assert_eq!(config.provider.args, defaults.provider.args);
        assert_eq!(config.provider.timeout, Duration::from_secs(7200));
        assert_eq!(config.provider.timeout, defaults.provider.timeout);
        assert_eq!(config.resume, defaults.resume);
        assert_eq!(config.reboot, defaults.reboot);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            max_attempts = 5
            retry_delay = "1m"

            [resume]
            unit_dir = "/run/systemd/system"

            [reboot]
            command = ["shutdown", "-r", "now"]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_secs(60));
        assert_eq!(config.resume.unit_dir, PathBuf::from("/run/systemd/system"));
        assert_eq!(config.resume.unit_name, DEFAULT_UNIT_NAME);
        assert_eq!(config.reboot.command, vec!["shutdown", "-r", "now"]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml("max_attempts = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("reboot_delay = \"5 minutes\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("[reboot]\ncommand = []"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("max_attempts = \"many\""),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::load(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.max_attempts, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "search_criteria = \"IsInstalled=0\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.search_criteria, "IsInstalled=0");
    }
}
