// src/models/user.rs

//! Normalized user profile records.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{AccountHandle, PlatformId};

/// Outcome of looking an account up on its platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Ok,
    /// The platform confirms the account does not exist
    NotFound,
    /// The platform refused to answer because of call limits
    RateLimited,
}

/// A user profile as reported by one platform.
///
/// Never mutated after parsing; a re-fetch produces a new value that
/// replaces the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub platform: PlatformId,

    pub handle: AccountHandle,

    /// Display name; falls back to the handle when the platform has none
    #[serde(default)]
    pub display_name: String,

    /// Current rating, when the platform has one
    #[serde(default)]
    pub rating: Option<i32>,

    /// Highest rating reached
    #[serde(default)]
    pub max_rating: Option<i32>,

    /// Number of solved problems, when the platform reports it
    #[serde(default)]
    pub solved: Option<u32>,

    #[serde(default)]
    pub status: UserStatus,
}

impl UserInfo {
    /// A profile for an existing account with only a display name.
    pub fn new(platform: PlatformId, handle: AccountHandle, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            handle.as_str().to_string()
        } else {
            display_name.trim().to_string()
        };

        Self {
            platform,
            handle,
            display_name,
            rating: None,
            max_rating: None,
            solved: None,
            status: UserStatus::Ok,
        }
    }

    /// Placeholder for an account the platform does not know.
    pub fn not_found(platform: PlatformId, handle: AccountHandle) -> Self {
        Self {
            status: UserStatus::NotFound,
            ..Self::new(platform, handle, "")
        }
    }

    /// Placeholder for a lookup refused by the platform's call limits.
    pub fn rate_limited(platform: PlatformId, handle: AccountHandle) -> Self {
        Self {
            status: UserStatus::RateLimited,
            ..Self::new(platform, handle, "")
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == UserStatus::Ok
    }

    /// Convert a non-`Ok` status into the matching error.
    pub fn ensure_found(self) -> Result<Self> {
        match self.status {
            UserStatus::Ok => Ok(self),
            UserStatus::NotFound => Err(AppError::not_found(
                self.platform,
                format!("account '{}'", self.handle),
            )),
            UserStatus::RateLimited => Err(AppError::RateLimited {
                platform: self.platform,
            }),
        }
    }
}

/// One entry of a platform's user search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub handle: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub rating: Option<i32>,

    #[serde(default)]
    pub solved: Option<u32>,
}
