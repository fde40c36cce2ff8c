//! Rating history diffs.
//!
//! Computes which rating changes a sync added to a stored history and which
//! ones the remote corrected, so the caller can report them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::RatingChange;

/// Changes between two snapshots of one account's rating history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingDiff {
    /// Contests absent from the previous snapshot, in history order
    pub added: Vec<RatingChange>,
    /// Contests present in both whose record changed
    pub corrected: Vec<RatingChange>,
}

impl RatingDiff {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.corrected.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.corrected.len()
    }

    /// Net rating movement over the added contests, when known.
    pub fn rating_delta(&self) -> Option<i32> {
        let first = self.added.first()?;
        let last = self.added.last()?;
        first.old_rating.map(|old| last.new_rating - old)
    }
}

/// Calculate the diff between previous and current snapshots.
///
/// Histories only grow under merge, so nothing is ever reported removed.
pub fn calculate_diff(previous: &[RatingChange], current: &[RatingChange]) -> RatingDiff {
    let prev_map: HashMap<&str, &RatingChange> = previous
        .iter()
        .map(|c| (c.contest_id.as_str(), c))
        .collect();

    let mut diff = RatingDiff::default();
    for change in current {
        match prev_map.get(change.contest_id.as_str()) {
            None => diff.added.push(change.clone()),
            Some(prev) if *prev != change => diff.corrected.push(change.clone()),
            Some(_) => {}
        }
    }
    diff
}
