//! Itemized persistence.
//!
//! Every persisted value is an *item*: a typed value stored under a string
//! key, wrapped in a schema-tagged [`Envelope`]. The [`ItemStore`] keeps all
//! items in memory for synchronous reads and live observation, and commits
//! writes through an [`ItemBackend`].
//!
//! ## On-disk layout (`LocalBackend`)
//!
//! ```text
//! {data_dir}/
//! └── items/
//!     ├── {sha256(key)}.json      # one envelope per item
//!     └── {sha256(key)}.json.tmp  # in-flight write, removed on open
//! ```

mod item;
pub mod items;
mod local;
mod memory;
mod store;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

pub use item::{Item, ItemWatch};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use store::ItemStore;

/// A validated item key: `/`-separated, non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let valid = !key.is_empty()
            && key
                .split('/')
                .all(|segment| !segment.is_empty() && !segment.chars().any(char::is_whitespace));
        if valid {
            Ok(Self(key))
        } else {
            Err(AppError::invalid(format!("malformed item key '{key}'")))
        }
    }

    /// Join segments with `/`. Segments may not contain `/` themselves.
    pub fn from_segments(segments: &[&str]) -> Result<Self> {
        if let Some(bad) = segments.iter().find(|s| s.contains('/')) {
            return Err(AppError::invalid(format!("key segment '{bad}' contains '/'")));
        }
        Self::new(segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable file name for this key: hex SHA-256 plus `.json`.
    pub fn file_name(&self) -> String {
        format!("{}.json", hex::encode(Sha256::digest(self.0.as_bytes())))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ItemKey> for String {
    fn from(key: ItemKey) -> Self {
        key.0
    }
}

/// The persisted form of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub key: ItemKey,
    /// Schema version of the writer
    pub schema: u32,
    pub updated_at: DateTime<Utc>,
    pub value: serde_json::Value,
}

/// Durable storage for envelopes.
///
/// Backends only move whole envelopes; locking, caching and notification
/// live in [`ItemStore`].
#[async_trait]
pub trait ItemBackend: Send + Sync {
    /// Every readable envelope. Unreadable entries are skipped with a
    /// warning and left in place.
    async fn load_all(&self) -> Result<Vec<Envelope>>;

    /// Atomically replace the envelope stored under its key.
    async fn put(&self, envelope: &Envelope) -> Result<()>;

    /// Remove the item; removing an absent item is not an error.
    async fn remove(&self, key: &ItemKey) -> Result<()>;

    /// Discard leftovers of interrupted writes. Returns how many were
    /// removed.
    async fn cleanup(&self) -> Result<usize> {
        Ok(0)
    }

    /// Human-readable location, for diagnostics.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(ItemKey::new("codeforces/user/tourist").is_ok());
        assert!(ItemKey::new("").is_err());
        assert!(ItemKey::new("codeforces//tourist").is_err());
        assert!(ItemKey::new("codeforces/user/").is_err());
        assert!(ItemKey::new("codeforces/user name").is_err());
    }

    #[test]
    fn test_key_from_segments() {
        let key = ItemKey::from_segments(&["timus", "user", "12345"]).unwrap();
        assert_eq!(key.as_str(), "timus/user/12345");
        assert!(ItemKey::from_segments(&["timus", "a/b"]).is_err());
    }

    #[test]
    fn test_file_name_is_stable_hex() {
        let key = ItemKey::new("codechef/tracked").unwrap();
        let name = key.file_name();
        assert_eq!(name, key.file_name());
        assert_eq!(name.len(), 64 + ".json".len());
        assert!(name.trim_end_matches(".json").chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(name, ItemKey::new("codechef/tracked2").unwrap().file_name());
    }

    #[test]
    fn test_envelope_rejects_bad_key() {
        let json = r#"{"key":"a//b","schema":1,"updated_at":"2024-01-01T00:00:00Z","value":null}"#;
        assert!(serde_json::from_str::<Envelope>(json).is_err());
    }
}
