// src/models/sync.rs

//! Bookkeeping records written by the sync pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};
use crate::models::AccountHandle;

/// Handles tracked on one platform, in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackedAccounts {
    #[serde(default)]
    pub handles: Vec<AccountHandle>,
}

impl TrackedAccounts {
    pub fn contains(&self, handle: &AccountHandle) -> bool {
        self.handles.contains(handle)
    }

    /// Returns false if the handle was already tracked.
    pub fn add(&mut self, handle: AccountHandle) -> bool {
        if self.contains(&handle) {
            return false;
        }
        self.handles.push(handle);
        true
    }

    /// Returns false if the handle was not tracked.
    pub fn remove(&mut self, handle: &AccountHandle) -> bool {
        let before = self.handles.len();
        self.handles.retain(|h| h != handle);
        self.handles.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// The last failure seen while syncing an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl SyncFailure {
    pub fn from_error(err: &AppError, at: DateTime<Utc>) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            at,
        }
    }
}

/// Per-account sync status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_failure: Option<SyncFailure>,

    /// Failed cycles since the last success
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl SyncState {
    pub fn record_success(mut self, at: DateTime<Utc>) -> Self {
        self.last_success = Some(at);
        self.consecutive_failures = 0;
        self
    }

    pub fn record_failure(mut self, err: &AppError, at: DateTime<Utc>) -> Self {
        self.last_failure = Some(SyncFailure::from_error(err, at));
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self
    }
}
