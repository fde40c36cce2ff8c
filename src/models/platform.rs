// src/models/platform.rs

//! Platform identifiers and platform-scoped account handles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A supported competitive-programming platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    /// Ratings site with a JSON API
    Codeforces,
    /// Online judge with HTML author pages
    Timus,
    /// Judge with ratings; JSON search and HTML profiles
    CodeChef,
    /// Problem archive; news, recent problems and an RSS feed
    ProjectEuler,
}

impl PlatformId {
    /// Every platform, in display order.
    pub const ALL: [PlatformId; 4] = [
        PlatformId::Codeforces,
        PlatformId::Timus,
        PlatformId::CodeChef,
        PlatformId::ProjectEuler,
    ];

    /// Stable lowercase tag used in item keys, config and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformId::Codeforces => "codeforces",
            PlatformId::Timus => "timus",
            PlatformId::CodeChef => "codechef",
            PlatformId::ProjectEuler => "projecteuler",
        }
    }

    /// Whether the platform exposes per-user account pages.
    pub fn supports_accounts(self) -> bool {
        !matches!(self, PlatformId::ProjectEuler)
    }

    /// Whether the platform publishes a per-contest rating history.
    pub fn has_rating_history(self) -> bool {
        matches!(self, PlatformId::Codeforces | PlatformId::CodeChef)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        PlatformId::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| AppError::invalid(format!("unknown platform '{s}'")))
    }
}

/// A validated, platform-scoped account identifier.
///
/// Unique within one [`PlatformId`] only; the same string may name
/// different people on different platforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountHandle(String);

impl AccountHandle {
    /// Validate `raw` against the platform's handle format.
    pub fn parse(platform: PlatformId, raw: &str) -> Result<Self> {
        let handle = raw.trim();
        if handle.is_empty() {
            return Err(AppError::invalid(format!("{platform}: empty handle")));
        }

        // Both sites treat handles case-insensitively; Timus ids are numbers.
        let canonical = match platform {
            PlatformId::Codeforces => ((3..=24).contains(&handle.len())
                && handle
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
            .then(|| handle.to_ascii_lowercase()),
            PlatformId::Timus => (handle.len() <= 9 && handle.chars().all(|c| c.is_ascii_digit()))
                .then(|| handle.parse::<u32>().ok())
                .flatten()
                .filter(|id| *id > 0)
                .map(|id| id.to_string()),
            PlatformId::CodeChef => (handle.len() <= 32
                && handle
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_'))
            .then(|| handle.to_ascii_lowercase()),
            PlatformId::ProjectEuler => {
                return Err(AppError::invalid(
                    "projecteuler: accounts are not publicly accessible",
                ));
            }
        };

        if let Some(canonical) = canonical {
            Ok(Self(canonical))
        } else {
            Err(AppError::invalid(format!(
                "{platform}: malformed handle '{handle}'"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A handle together with the platform it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Account {
    pub platform: PlatformId,
    pub handle: AccountHandle,
}

impl Account {
    /// Validate and pair a raw handle with its platform.
    pub fn new(platform: PlatformId, raw_handle: &str) -> Result<Self> {
        Ok(Self {
            platform,
            handle: AccountHandle::parse(platform, raw_handle)?,
        })
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trip_tag() {
        for p in PlatformId::ALL {
            assert_eq!(p.as_str().parse::<PlatformId>().unwrap(), p);
        }
        assert_eq!(" CodeChef ".parse::<PlatformId>().unwrap(), PlatformId::CodeChef);
        assert!("topcoder".parse::<PlatformId>().is_err());
    }

    #[test]
    fn test_codeforces_handles() {
        assert!(AccountHandle::parse(PlatformId::Codeforces, "tourist").is_ok());
        assert!(AccountHandle::parse(PlatformId::Codeforces, "Um_nik").is_ok());
        assert!(AccountHandle::parse(PlatformId::Codeforces, "ab").is_err());
        assert!(AccountHandle::parse(PlatformId::Codeforces, "bad handle").is_err());
        assert!(AccountHandle::parse(PlatformId::Codeforces, &"x".repeat(25)).is_err());
    }

    #[test]
    fn test_codeforces_handles_ignore_case() {
        let lower = AccountHandle::parse(PlatformId::Codeforces, "tourist").unwrap();
        let upper = AccountHandle::parse(PlatformId::Codeforces, "Tourist").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.as_str(), "tourist");
    }

    #[test]
    fn test_timus_ids() {
        let id = AccountHandle::parse(PlatformId::Timus, " 12345 ").unwrap();
        assert_eq!(id.as_str(), "12345");
        assert!(AccountHandle::parse(PlatformId::Timus, "0").is_err());
        assert!(AccountHandle::parse(PlatformId::Timus, "12a").is_err());
        assert!(AccountHandle::parse(PlatformId::Timus, "1234567890").is_err());
    }

    #[test]
    fn test_timus_ids_drop_leading_zeros() {
        let id = AccountHandle::parse(PlatformId::Timus, "012345").unwrap();
        assert_eq!(id.as_str(), "12345");
        assert_eq!(id, AccountHandle::parse(PlatformId::Timus, "12345").unwrap());
        assert!(AccountHandle::parse(PlatformId::Timus, "000").is_err());
    }

    #[test]
    fn test_codechef_handles() {
        assert!(AccountHandle::parse(PlatformId::CodeChef, "gennady_korotkevich").is_ok());
        assert_eq!(
            AccountHandle::parse(PlatformId::CodeChef, "Gennady_K").unwrap().as_str(),
            "gennady_k"
        );
        assert!(AccountHandle::parse(PlatformId::CodeChef, "a.b").is_err());
        assert!(AccountHandle::parse(PlatformId::CodeChef, "").is_err());
    }

    #[test]
    fn test_project_euler_has_no_accounts() {
        let err = AccountHandle::parse(PlatformId::ProjectEuler, "someone").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_serde_tags() {
        let json = serde_json::to_string(&PlatformId::ProjectEuler).unwrap();
        assert_eq!(json, "\"projecteuler\"");
    }
}
