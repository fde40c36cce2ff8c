//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::PlatformId;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Sync pipeline behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Item store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Base URL overrides per platform
    #[serde(default)]
    pub platforms: PlatformUrls,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        if self.sync.max_concurrent == 0 {
            return Err(AppError::config("sync.max_concurrent must be > 0"));
        }
        if self.sync.retry.max_attempts == 0 {
            return Err(AppError::config("sync.retry.max_attempts must be > 0"));
        }
        if self.sync.retry.base_delay_ms > self.sync.retry.max_delay_ms {
            return Err(AppError::config(
                "sync.retry.base_delay_ms must not exceed sync.retry.max_delay_ms",
            ));
        }
        if self.store.data_dir.as_os_str().is_empty() {
            return Err(AppError::config("store.data_dir is empty"));
        }
        for platform in PlatformId::ALL {
            let base = self.platforms.base_url(platform);
            let url = url::Url::parse(base)
                .map_err(|e| AppError::config(format!("platforms.{platform}: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AppError::config(format!(
                    "platforms.{platform}: unsupported scheme '{}'",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Sync pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum accounts synced at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Delay after each finished account, in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            request_delay_ms: defaults::request_delay(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry and backoff settings for one account sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay(),
            max_delay_ms: defaults::max_delay(),
        }
    }
}

/// Item store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the persisted items
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

/// Base URLs of every platform. Overridable for mirrors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformUrls {
    #[serde(default = "defaults::codeforces")]
    pub codeforces: String,

    #[serde(default = "defaults::timus")]
    pub timus: String,

    #[serde(default = "defaults::codechef")]
    pub codechef: String,

    #[serde(default = "defaults::projecteuler")]
    pub projecteuler: String,
}

impl PlatformUrls {
    pub fn base_url(&self, platform: PlatformId) -> &str {
        match platform {
            PlatformId::Codeforces => &self.codeforces,
            PlatformId::Timus => &self.timus,
            PlatformId::CodeChef => &self.codechef,
            PlatformId::ProjectEuler => &self.projecteuler,
        }
    }
}

impl Default for PlatformUrls {
    fn default() -> Self {
        Self {
            codeforces: defaults::codeforces(),
            timus: defaults::timus(),
            codechef: defaults::codechef(),
            projecteuler: defaults::projecteuler(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; cptrack/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Sync defaults
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn request_delay() -> u64 {
        250
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn base_delay() -> u64 {
        1_000
    }
    pub fn max_delay() -> u64 {
        30_000
    }

    // Store defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }

    // Platform defaults
    pub fn codeforces() -> String {
        "https://codeforces.com".into()
    }
    pub fn timus() -> String {
        "https://timus.online".into()
    }
    pub fn codechef() -> String {
        "https://www.codechef.com".into()
    }
    pub fn projecteuler() -> String {
        "https://projecteuler.net".into()
    }
}
