// src/models/mod.rs

//! Domain models for the tracker.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod euler;
mod platform;
mod rating;
mod sync;
mod user;

// Re-export all public types
pub use config::{Config, HttpConfig, PlatformUrls, RetryConfig, StoreConfig, SyncConfig};
pub use euler::{NewsEntry, ProblemInfo, RecentProblem};
pub use platform::{Account, AccountHandle, PlatformId};
pub use rating::{RatingChange, RatingHistory};
pub use sync::{SyncFailure, SyncState, TrackedAccounts};
pub use user::{SearchHit, UserInfo, UserStatus};
