// src/engine.rs

//! Install-and-reboot decision engine
//!
//! One call to [`DecisionEngine::run_pass`] walks a single pass:
//!
//! ```text
//! Searching -> (NoUpdates | Downloading) -> Installing -> Deciding
//! ```
//!
//! Every pass starts from a fresh search; nothing from an earlier pass's
//! install result is carried into the next decision.
//!
//! Reboot rules, applied in [`decide`]:
//!
//! - `Failed` with retries left: reboot and spend one retry
//! - `Failed` with no retries left: stop, no reboot
//! - any other result with `reboot_required`: reboot, budget unchanged
//! - otherwise: continue with the next pass

use crate::config::Config;
use crate::filter;
use crate::provider::UpdateProvider;
use crate::retry::{self, RetryPolicy};
use crate::update::{OperationResult, OperationResultCode, RetryBudget, UpdateSet};
use tracing::{debug, error, info, warn};

/// Stage of a pass, used for log context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStage {
    Searching,
    Downloading,
    Installing,
    Deciding,
}

impl std::fmt::Display for PassStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Searching => write!(f, "searching"),
            Self::Downloading => write!(f, "downloading"),
            Self::Installing => write!(f, "installing"),
            Self::Deciding => write!(f, "deciding"),
        }
    }
}

/// Why a pass asks for a reboot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootReason {
    /// The provider reported that installed updates need a restart
    RebootRequired,
    /// Install failed and a reboot retry is being spent
    RetryAfterFailure,
}

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The filtered search found nothing to do
    NoUpdates,

    /// Updates were processed and no reboot is needed
    Continue { result: OperationResult },

    /// Reboot, resuming afterwards with `retry_budget`
    Reboot {
        result: OperationResult,
        reason: RebootReason,
        retry_budget: RetryBudget,
    },

    /// Install failed and no reboot retries remain
    Exhausted { result: OperationResult },
}

/// Decide what follows an install result
pub fn decide(result: OperationResult, budget: RetryBudget) -> PassOutcome {
    if result.is_failed() {
        return match budget.consume() {
            Some(remaining) => PassOutcome::Reboot {
                result,
                reason: RebootReason::RetryAfterFailure,
                retry_budget: remaining,
            },
            None => PassOutcome::Exhausted { result },
        };
    }

    if result.reboot_required {
        return PassOutcome::Reboot {
            result,
            reason: RebootReason::RebootRequired,
            retry_budget: budget,
        };
    }

    PassOutcome::Continue { result }
}

/// Runs search, download and install against a provider
pub struct DecisionEngine<'a> {
    config: &'a Config,
    provider: &'a mut dyn UpdateProvider,
    policy: RetryPolicy,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(config: &'a Config, provider: &'a mut dyn UpdateProvider) -> Self {
        Self {
            config,
            provider,
            policy: RetryPolicy::from_config(config),
        }
    }

    /// Run one full pass with the current retry budget
    pub fn run_pass(&mut self, budget: RetryBudget) -> PassOutcome {
        debug!("Pass stage: {}", PassStage::Searching);
        let updates = self.search();
        if updates.is_empty() {
            info!("No updates found");
            return PassOutcome::NoUpdates;
        }

        debug!("Pass stage: {}", PassStage::Downloading);
        let installable = self.download(&updates);

        debug!("Pass stage: {}", PassStage::Installing);
        let result = self.install(&installable);

        debug!("Pass stage: {}", PassStage::Deciding);
        decide(result, budget)
    }

    /// Search and keep only updates that need no user input
    ///
    /// A search that fails even after retries counts as "no updates".
    fn search(&mut self) -> UpdateSet {
        info!("Searching for updates");
        let criteria = &self.config.search_criteria;
        let found = retry::search_with_retry(&mut *self.provider, &self.policy, criteria);

        if found.result_code == OperationResultCode::Failed {
            warn!("Update search failed, treating as no updates for this pass");
            return UpdateSet::new();
        }
        info!("Search finished with {} ({} found)", found.result_code, found.updates.len());

        filter::no_user_input(&found.updates)
    }

    /// Download what is missing and return the installable subset of `updates`
    fn download(&mut self, updates: &UpdateSet) -> UpdateSet {
        let request = filter::not_downloaded(updates);
        if request.is_empty() {
            debug!("All updates already downloaded");
            return filter::downloaded(updates);
        }

        info!("Downloading {} update(s)", request.len());
        let result = retry::download_with_retry(&mut *self.provider, &self.policy, &request);
        info!("Download finished with {}", result.result_code);

        // The original set, not the request, so previously downloaded
        // updates stay installable
        let current = match retry::refresh_with_retry(&mut *self.provider, &self.policy, updates) {
            Some(status) => updates.merged_with(&status),
            None => {
                warn!("Could not refresh update status, using search snapshot");
                updates.clone()
            }
        };
        filter::downloaded(&current)
    }

    /// Attempt the install exactly once
    fn install(&mut self, installable: &UpdateSet) -> OperationResult {
        if installable.is_empty() {
            error!("Error installing updates. Nothing was downloaded successfully");
            return OperationResult::failed();
        }

        info!("Installing {} update(s)", installable.len());
        let result = match self.provider.install(installable) {
            Ok(result) => {
                if result.is_failed() {
                    error!("Error installing updates.");
                }
                result
            }
            Err(e) => {
                // A broken session during install always needs a restart to clear
                error!("Error installing updates. {}", e);
                OperationResult::new(OperationResultCode::Failed, true)
            }
        };

        info!(
            "Install finished with {} (reboot required: {})",
            result.result_code, result.reboot_required
        );
        result
    }
}
