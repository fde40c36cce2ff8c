//! Sync pipeline.
//!
//! - `Syncer`: fetch → parse → merge → store, per account, with bounded
//!   concurrency, per-account serialization and cancellation
//! - `RetryPolicy`: which failures are retried and how long to wait
//! - `calculate_diff`: what a sync added to a rating history
//! - `run_validate`: configuration check for the CLI

pub mod diff;
pub mod retry;
pub mod sync;
pub mod validate;

pub use diff::{RatingDiff, calculate_diff};
pub use retry::RetryPolicy;
pub use sync::{EulerDigest, SyncOutcome, SyncReport, SyncSummary, SyncTask, Syncer};
pub use validate::run_validate;
