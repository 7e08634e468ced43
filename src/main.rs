// src/main.rs

use anyhow::{Context, Result};
use autopatch::config::CONFIG_ENV;
use autopatch::{
    CommandProvider, CommandRebooter, Config, Driver, ResumeState, RetryBudget, RunOutcome,
    SystemdRegistrar,
};
use clap::Parser;
use tracing::info;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::default_path();
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let program = std::env::current_exe().context("Failed to locate the autopatch executable")?;

    let mut provider = CommandProvider::from_config(&config.provider);
    // The resumed instance must read the same config, wherever it came from
    let config_path = std::path::absolute(&config_path)
        .with_context(|| format!("Failed to resolve {}", config_path.display()))?;
    let mut registrar = SystemdRegistrar::from_config(&config.resume)
        .with_environment(CONFIG_ENV, config_path.to_string_lossy());
    let mut rebooter = CommandRebooter::from_config(&config.reboot);

    let resume = ResumeState::new(&mut registrar, program);
    let mut driver = Driver::new(
        &config,
        &mut provider,
        resume,
        &mut rebooter,
        RetryBudget::new(cli.retries_on_reboot),
    );

    match driver.run().context("Update run failed")? {
        RunOutcome::Completed { passes } => {
            info!("System is up to date ({} pass(es))", passes);
        }
        RunOutcome::Rebooting { retry_budget } => {
            info!(
                "Reboot requested, will resume with {} retries remaining",
                retry_budget
            );
        }
    }

    Ok(())
}
