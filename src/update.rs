// src/update.rs

//! Update metadata and operation results
//!
//! Updates are owned by the provider; this crate only holds snapshots of
//! them. Every pipeline stage produces a fresh [`UpdateSet`] rather than
//! mutating the previous one.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A single update as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Opaque provider identifier used to address the update in later calls
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Whether installing requires interactive input (EULA, prompts)
    #[serde(default)]
    pub requires_user_input: bool,

    /// Whether the payload is already present locally
    #[serde(default)]
    pub is_downloaded: bool,
}

impl Update {
    /// Create a not-yet-downloaded update that needs no user input
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            requires_user_input: false,
            is_downloaded: false,
        }
    }
}

/// Ordered snapshot of updates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateSet {
    updates: Vec<Update>,
}

impl UpdateSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Update> {
        self.updates.iter()
    }

    /// Provider identifiers, in set order
    pub fn ids(&self) -> Vec<&str> {
        self.updates.iter().map(|u| u.id.as_str()).collect()
    }

    /// Titles, in set order
    pub fn titles(&self) -> Vec<&str> {
        self.updates.iter().map(|u| u.title.as_str()).collect()
    }

    /// Produce a new set holding the updates that match `predicate`
    pub fn filtered<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Update) -> bool,
    {
        Self {
            updates: self.updates.iter().filter(|u| predicate(u)).cloned().collect(),
        }
    }

    /// Overlay newer metadata from `current`, matched by id
    ///
    /// Order and membership stay those of `self`. Updates absent from
    /// `current` keep their snapshot flags and ids only in `current` are
    /// ignored.
    pub fn merged_with(&self, current: &UpdateSet) -> Self {
        self.updates
            .iter()
            .map(|update| {
                current
                    .iter()
                    .find(|fresh| fresh.id == update.id)
                    .unwrap_or(update)
                    .clone()
            })
            .collect()
    }
}

impl From<Vec<Update>> for UpdateSet {
    fn from(updates: Vec<Update>) -> Self {
        Self { updates }
    }
}

impl FromIterator<Update> for UpdateSet {
    fn from_iter<I: IntoIterator<Item = Update>>(iter: I) -> Self {
        Self {
            updates: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a UpdateSet {
    type Item = &'a Update;
    type IntoIter = std::slice::Iter<'a, Update>;

    fn into_iter(self) -> Self::IntoIter {
        self.updates.iter()
    }
}

/// Outcome code of a provider operation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum OperationResultCode {
    NotStarted,
    InProgress,
    Succeeded,
    SucceededWithErrors,
    Failed,
    Aborted,
}

/// Result of a download or install operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub result_code: OperationResultCode,

    #[serde(default)]
    pub reboot_required: bool,
}

impl OperationResult {
    pub fn new(result_code: OperationResultCode, reboot_required: bool) -> Self {
        Self {
            result_code,
            reboot_required,
        }
    }

    /// Successful result that needs no reboot
    pub fn succeeded() -> Self {
        Self::new(OperationResultCode::Succeeded, false)
    }

    /// Failed result that needs no reboot
    pub fn failed() -> Self {
        Self::new(OperationResultCode::Failed, false)
    }

    pub fn is_failed(&self) -> bool {
        self.result_code == OperationResultCode::Failed
    }
}

/// Remaining reboot retries after failed installs
///
/// Only ever decreases, one step at a time, via [`RetryBudget::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RetryBudget(u32);

impl RetryBudget {
    pub fn new(remaining: u32) -> Self {
        Self(remaining)
    }

    pub fn remaining(&self) -> u32 {
        self.0
    }

    pub fn is_exhausted(&self) -> bool {
        self.0 == 0
    }

    /// Spend one retry, returning the reduced budget
    ///
    /// Returns `None` when the budget is already exhausted.
    pub fn consume(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

impl std::fmt::Display for RetryBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
