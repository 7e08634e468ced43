// src/cli.rs
//! Command-line interface for autopatch
//!
//! The only input is the reboot retry budget. Everything else comes from
//! the config file (see `autopatch::config`).

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "autopatch")]
#[command(author, version)]
#[command(
    about = "Unattended OS update installer that reboots and resumes until no updates remain",
    long_about = None
)]
pub struct Cli {
    /// Reboots allowed to retry a failed install before giving up
    #[arg(long, value_name = "COUNT", default_value_t = 3)]
    pub retries_on_reboot: u32,
}
