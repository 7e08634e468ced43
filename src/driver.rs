// src/driver.rs

//! Top-level update loop
//!
//! Repeats passes until a search (after filtering) finds nothing, then
//! clears the resume record. A reboot ends the run: the record written
//! just before it is how the next boot picks up where this one stopped.

use crate::config::Config;
use crate::engine::{DecisionEngine, PassOutcome, RebootReason};
use crate::error::{Error, Result};
use crate::provider::UpdateProvider;
use crate::reboot::Rebooter;
use crate::resume::ResumeState;
use crate::update::RetryBudget;
use tracing::{error, info, warn};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No updates remain; the resume record has been cleared
    Completed { passes: u32 },

    /// A reboot was requested; the next boot resumes with `retry_budget`
    Rebooting { retry_budget: RetryBudget },
}

/// Wires the engine, resume state and reboot trigger together
pub struct Driver<'a> {
    config: &'a Config,
    provider: &'a mut dyn UpdateProvider,
    resume: ResumeState<'a>,
    rebooter: &'a mut dyn Rebooter,
    budget: RetryBudget,
}

impl<'a> Driver<'a> {
    pub fn new(
        config: &'a Config,
        provider: &'a mut dyn UpdateProvider,
        resume: ResumeState<'a>,
        rebooter: &'a mut dyn Rebooter,
        budget: RetryBudget,
    ) -> Self {
        Self {
            config,
            provider,
            resume,
            rebooter,
            budget,
        }
    }

    /// Run passes until done, a reboot is requested, or retries run out
    pub fn run(&mut self) -> Result<RunOutcome> {
        match self.resume.current()? {
            Some(record) => info!(
                "Resuming after reboot with {} retries remaining (recorded: {})",
                self.budget, record.retry_budget
            ),
            None => info!("Starting update run with {} retries on reboot", self.budget),
        }

        let mut engine = DecisionEngine::new(self.config, &mut *self.provider);
        let mut passes = 0;

        loop {
            passes += 1;
            info!("Starting pass {}", passes);

            match engine.run_pass(self.budget) {
                PassOutcome::NoUpdates => {
                    self.resume.clear()?;
                    info!("No updates remaining after {} pass(es), done", passes);
                    return Ok(RunOutcome::Completed { passes });
                }
                PassOutcome::Continue { result } => {
                    info!(
                        "Pass {} finished with {} without a reboot, searching again",
                        passes, result.result_code
                    );
                }
                PassOutcome::Reboot {
                    reason,
                    retry_budget,
                    ..
                } => {
                    match reason {
                        RebootReason::RetryAfterFailure => {
                            warn!("Rebooting with {} retries remaining.", retry_budget)
                        }
                        RebootReason::RebootRequired => {
                            info!("Rebooting with {} retries remaining.", retry_budget)
                        }
                    }
                    self.resume.persist(retry_budget)?;

                    if !self.config.reboot_delay.is_zero() {
                        std::thread::sleep(self.config.reboot_delay);
                    }
                    self.rebooter.reboot()?;
                    return Ok(RunOutcome::Rebooting { retry_budget });
                }
                PassOutcome::Exhausted { result } => {
                    error!("Error installing updates. No reboot retries remaining.");
                    return Err(Error::RetriesExhausted {
                        result_code: result.result_code,
                    });
                }
            }
        }
    }
}
