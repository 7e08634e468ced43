// tests/common/mod.rs

//! Shared fakes for integration tests.

#![allow(dead_code)]

use autopatch::{
    Config, Driver, OperationResult, OperationResultCode, ProviderError, Rebooter,
    ResumeRegistrar, ResumeState, RetryBudget, RunOutcome, SearchResult, Update, UpdateProvider,
    UpdateSet,
};
use std::collections::VecDeque;
use std::time::Duration;

/// Program path embedded in resume commands during tests
pub const PROGRAM: &str = "/usr/sbin/autopatch";

/// Default config with every delay removed.
pub fn test_config() -> Config {
    Config {
        retry_delay: Duration::ZERO,
        reboot_delay: Duration::ZERO,
        ..Config::default()
    }
}

/// A provider call, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search,
    Download(Vec<String>),
    Refresh,
    Install(Vec<String>),
}

/// In-memory update backend with scripted failures.
///
/// Downloads mark the requested updates as downloaded. Successful installs
/// remove the installed updates so the next search no longer finds them.
#[derive(Default)]
pub struct FakeProvider {
    /// Updates the backend still offers
    pub available: Vec<Update>,
    /// Remaining search calls that fail with a provider error
    pub search_errors: u32,
    /// Remaining download calls that fail with a provider error
    pub download_errors: u32,
    /// Scripted install answers; `Succeeded` without reboot once exhausted
    pub install_results: VecDeque<Result<OperationResult, String>>,
    /// Answer used for every install once the script is empty
    pub install_fallback: Option<OperationResult>,
    /// Whether downloads actually fetch anything
    pub downloads_arrive: bool,
    /// Remaining status calls that fail with a provider error
    pub refresh_errors: u32,
    /// Ids the status query leaves out of its answer
    pub status_omits: Vec<String>,
    pub calls: Vec<Call>,
}

impl FakeProvider {
    pub fn with_updates(titles: &[&str]) -> Self {
        Self {
            available: titles
                .iter()
                .enumerate()
                .map(|(i, title)| Update::new(format!("kb{}", i + 1), *title))
                .collect(),
            downloads_arrive: true,
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::with_updates(&[])
    }

    /// Every install reports `code`
    pub fn always_install(mut self, code: OperationResultCode, reboot_required: bool) -> Self {
        self.install_fallback = Some(OperationResult::new(code, reboot_required));
        self
    }

    pub fn count(&self, wanted: fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| wanted(c)).count()
    }

    fn lookup(&self, updates: &UpdateSet) -> UpdateSet {
        self.available
            .iter()
            .filter(|u| updates.iter().any(|w| w.id == u.id))
            .filter(|u| !self.status_omits.contains(&u.id))
            .cloned()
            .collect()
    }
}

impl UpdateProvider for FakeProvider {
    fn search(&mut self, _criteria: &str) -> Result<SearchResult, ProviderError> {
        self.calls.push(Call::Search);
        if self.search_errors > 0 {
            self.search_errors -= 1;
            return Err(ProviderError::Backend("search service unavailable".to_string()));
        }
        Ok(SearchResult {
            result_code: OperationResultCode::Succeeded,
            updates: self.available.iter().cloned().collect(),
        })
    }

    fn download(&mut self, updates: &UpdateSet) -> Result<OperationResult, ProviderError> {
        let ids: Vec<String> = updates.ids().into_iter().map(String::from).collect();
        self.calls.push(Call::Download(ids.clone()));
        if self.download_errors > 0 {
            self.download_errors -= 1;
            return Err(ProviderError::Backend("connection reset".to_string()));
        }
        if !self.downloads_arrive {
            return Ok(OperationResult::failed());
        }
        for update in self.available.iter_mut().filter(|u| ids.contains(&u.id)) {
            update.is_downloaded = true;
        }
        Ok(OperationResult::succeeded())
    }

    fn install(&mut self, updates: &UpdateSet) -> Result<OperationResult, ProviderError> {
        let ids: Vec<String> = updates.ids().into_iter().map(String::from).collect();
        self.calls.push(Call::Install(ids.clone()));

        let answer = self
            .install_results
            .pop_front()
            .unwrap_or_else(|| Ok(self.install_fallback.unwrap_or_else(OperationResult::succeeded)));
        let result = answer.map_err(ProviderError::Backend)?;

        if matches!(
            result.result_code,
            OperationResultCode::Succeeded | OperationResultCode::SucceededWithErrors
        ) {
            self.available.retain(|u| !ids.contains(&u.id));
        }
        Ok(result)
    }

    fn refresh(&mut self, updates: &UpdateSet) -> Result<UpdateSet, ProviderError> {
        self.calls.push(Call::Refresh);
        if self.refresh_errors > 0 {
            self.refresh_errors -= 1;
            return Err(ProviderError::Protocol {
                verb: "status",
                reason: "status query reported Failed".to_string(),
            });
        }
        Ok(self.lookup(updates))
    }
}

/// Registrar keeping the launch command in memory.
#[derive(Default)]
pub struct MemoryRegistrar {
    pub command: Option<String>,
    pub register_calls: u32,
    pub unregister_calls: u32,
}

impl ResumeRegistrar for MemoryRegistrar {
    fn register(&mut self, launch_command: &str) -> autopatch::Result<()> {
        self.register_calls += 1;
        self.command = Some(launch_command.to_string());
        Ok(())
    }

    fn unregister(&mut self) -> autopatch::Result<()> {
        self.unregister_calls += 1;
        self.command = None;
        Ok(())
    }

    fn registered_command(&self) -> autopatch::Result<Option<String>> {
        Ok(self.command.clone())
    }
}

/// Rebooter that only counts requests.
#[derive(Default)]
pub struct RecordingRebooter {
    pub reboots: u32,
}

impl Rebooter for RecordingRebooter {
    fn reboot(&mut self) -> autopatch::Result<()> {
        self.reboots += 1;
        Ok(())
    }
}

/// Run one process instance of the driver.
pub fn run_once(
    config: &Config,
    provider: &mut FakeProvider,
    registrar: &mut MemoryRegistrar,
    rebooter: &mut RecordingRebooter,
    budget: u32,
) -> autopatch::Result<RunOutcome> {
    let resume = ResumeState::new(registrar, PROGRAM);
    let mut driver = Driver::new(config, provider, resume, rebooter, RetryBudget::new(budget));
    driver.run()
}
