// src/filter.rs

//! Update selection filters
//!
//! Stateless narrowing of an [`UpdateSet`]. Each filter returns a new set
//! and logs the titles it kept; the log listing is not part of the result.

use crate::update::{Update, UpdateSet};
use tracing::info;

/// Updates that can be installed without anyone at the console
///
/// Updates needing input are dropped for the whole run.
pub fn no_user_input(updates: &UpdateSet) -> UpdateSet {
    select(updates, "Updates not requiring user input", |u| {
        !u.requires_user_input
    })
}

/// Updates whose payload still has to be fetched
pub fn not_downloaded(updates: &UpdateSet) -> UpdateSet {
    select(updates, "Updates to download", |u| !u.is_downloaded)
}

/// Updates whose payload is present and ready to install
pub fn downloaded(updates: &UpdateSet) -> UpdateSet {
    select(updates, "Updates ready to install", |u| u.is_downloaded)
}

fn select<F>(updates: &UpdateSet, heading: &str, predicate: F) -> UpdateSet
where
    F: Fn(&Update) -> bool,
{
    let selected = updates.filtered(predicate);
    if !selected.is_empty() {
        info!("{} ({}):", heading, selected.len());
        for title in selected.titles() {
            info!("  - {}", title);
        }
    }
    selected
}
