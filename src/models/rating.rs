// src/models/rating.rs

//! Rating changes and the per-account rating history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single contest's effect on an account's rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    /// Platform contest identifier; identity key within one history
    pub contest_id: String,

    #[serde(default)]
    pub contest_name: String,

    /// Rating before the contest (unknown on some platforms)
    #[serde(default)]
    pub old_rating: Option<i32>,

    pub new_rating: i32,

    #[serde(default)]
    pub rank: Option<u32>,

    /// When the rating update was published
    pub time: DateTime<Utc>,
}

impl RatingChange {
    /// Rating delta, when the previous rating is known.
    pub fn delta(&self) -> Option<i32> {
        self.old_rating.map(|old| self.new_rating - old)
    }
}

/// The stored rating history of one account, ordered by time ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingHistory {
    #[serde(default)]
    pub changes: Vec<RatingChange>,
}

impl RatingHistory {
    pub fn new(changes: Vec<RatingChange>) -> Self {
        let mut history = Self::default();
        history.merge(changes);
        history
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The most recent change.
    pub fn latest(&self) -> Option<&RatingChange> {
        self.changes.last()
    }

    /// Merge fetched changes into the history.
    ///
    /// Changes with an unseen `contest_id` are added; a change whose key is
    /// already present replaces the stored entry. The result is re-sorted by
    /// time with a stable sort, so entries sharing a timestamp keep the order
    /// in which they were merged. Returns whether anything changed.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = RatingChange>) -> bool {
        let mut positions: HashMap<String, usize> = self
            .changes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.contest_id.clone(), i))
            .collect();

        let mut changed = false;
        for change in incoming {
            match positions.get(&change.contest_id) {
                Some(&i) => {
                    if self.changes[i] != change {
                        self.changes[i] = change;
                        changed = true;
                    }
                }
                None => {
                    positions.insert(change.contest_id.clone(), self.changes.len());
                    self.changes.push(change);
                    changed = true;
                }
            }
        }

        if changed {
            self.changes.sort_by_key(|c| c.time);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn change(id: &str, day: u32, new_rating: i32) -> RatingChange {
        RatingChange {
            contest_id: id.to_string(),
            contest_name: format!("Round {id}"),
            old_rating: Some(1500),
            new_rating,
            rank: Some(10),
            time: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_overlapping_merge() {
        let mut history = RatingHistory::default();
        history.merge(vec![change("1", 1, 1600), change("2", 2, 1650)]);
        history.merge(vec![change("2", 2, 1650), change("3", 3, 1700)]);

        let ids: Vec<_> = history.changes.iter().map(|c| c.contest_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let fetched = vec![change("1", 1, 1600), change("2", 2, 1650)];
        let mut history = RatingHistory::new(fetched.clone());
        let before = history.clone();

        assert!(!history.merge(fetched));
        assert_eq!(history, before);
    }

    #[test]
    fn test_merge_sorts_by_time() {
        let history = RatingHistory::new(vec![change("b", 5, 1700), change("a", 1, 1600)]);
        assert_eq!(history.changes[0].contest_id, "a");
        assert_eq!(history.latest().unwrap().contest_id, "b");
    }

    #[test]
    fn test_merge_replaces_corrected_entry() {
        let mut history = RatingHistory::new(vec![change("1", 1, 1600)]);
        assert!(history.merge([change("1", 1, 1590)]));
        assert_eq!(history.len(), 1);
        assert_eq!(history.changes[0].new_rating, 1590);
    }

    #[test]
    fn test_delta() {
        assert_eq!(change("1", 1, 1600).delta(), Some(100));
    }
}
