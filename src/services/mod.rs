//! Platform clients.
//!
//! One client per platform, each knowing its URL scheme, required headers
//! and which status codes carry a parseable answer. Clients return raw
//! payloads; [`PlatformClient`] pairs them with the matching parser and
//! exposes the capabilities shared by every platform.
//!
//! - `CodeforcesClient`: JSON API (`user.info`, `user.rating`)
//! - `TimusClient`: author and search pages
//! - `CodeChefClient`: profile pages and the ratings search API
//! - `EulerClient`: news, recent problems, problem pages, RSS

mod codechef;
mod codeforces;
mod euler;
mod timus;

pub use codechef::CodeChefClient;
pub use codeforces::CodeforcesClient;
pub use euler::EulerClient;
pub use timus::TimusClient;

use crate::error::{AppError, Result};
use crate::models::{
    AccountHandle, Config, PlatformId, PlatformUrls, RatingChange, SearchHit, UserInfo,
    UserStatus,
};
use crate::parsers;
use crate::utils::http::HttpFetcher;

/// Join a base URL and a path with exactly one slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Trimmed, non-empty search query.
pub(crate) fn search_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        Err(AppError::invalid("search query is empty"))
    } else {
        Ok(query)
    }
}

/// Everything one sync cycle learns about an account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub info: UserInfo,
    /// `None` when the platform keeps no history or the account is gone
    pub history: Option<Vec<RatingChange>>,
}

/// Closed set of platform adapters.
#[derive(Debug, Clone)]
pub enum PlatformClient {
    Codeforces(CodeforcesClient),
    Timus(TimusClient),
    CodeChef(CodeChefClient),
    ProjectEuler(EulerClient),
}

impl PlatformClient {
    pub fn new(platform: PlatformId, fetcher: HttpFetcher, urls: &PlatformUrls) -> Self {
        let base = urls.base_url(platform).to_string();
        match platform {
            PlatformId::Codeforces => Self::Codeforces(CodeforcesClient::new(fetcher, base)),
            PlatformId::Timus => Self::Timus(TimusClient::new(fetcher, base)),
            PlatformId::CodeChef => Self::CodeChef(CodeChefClient::new(fetcher, base)),
            PlatformId::ProjectEuler => Self::ProjectEuler(EulerClient::new(fetcher, base)),
        }
    }

    /// Build a client with its own HTTP client from `config`.
    pub fn from_config(platform: PlatformId, config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self::new(platform, fetcher, &config.platforms))
    }

    /// One client per platform, sharing a single connection pool.
    pub fn all(config: &Config) -> Result<Vec<Self>> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(PlatformId::ALL
            .iter()
            .map(|&platform| Self::new(platform, fetcher.clone(), &config.platforms))
            .collect())
    }

    pub fn platform(&self) -> PlatformId {
        match self {
            Self::Codeforces(_) => PlatformId::Codeforces,
            Self::Timus(_) => PlatformId::Timus,
            Self::CodeChef(_) => PlatformId::CodeChef,
            Self::ProjectEuler(_) => PlatformId::ProjectEuler,
        }
    }

    fn unsupported(&self, capability: &str) -> AppError {
        AppError::invalid(format!("{}: {capability} is not supported", self.platform()))
    }

    /// Fetch and parse the profile of `handle`.
    ///
    /// Unknown accounts come back as `UserInfo` with `status = NotFound`
    /// where the platform reports them in the page body, and as
    /// `AppError::NotFound` where it answers with a 404.
    pub async fn fetch_user_info(&self, handle: &str) -> Result<UserInfo> {
        let handle = AccountHandle::parse(self.platform(), handle)?;
        match self {
            Self::Codeforces(client) => {
                let payload = client.get_user_info(&handle).await?;
                parsers::codeforces::parse_user_info(&handle, &payload.body)
            }
            Self::Timus(client) => {
                let payload = client.get_user_page(&handle).await?;
                parsers::timus::parse_user_page(&handle, &payload.body)
            }
            Self::CodeChef(client) => {
                let payload = client.get_user_page(&handle).await?;
                parsers::codechef::parse_user_page(&handle, &payload.body)
            }
            Self::ProjectEuler(_) => Err(self.unsupported("account lookup")),
        }
    }

    /// Fetch and parse the rating history of `handle`, in source order.
    pub async fn fetch_rating_history(&self, handle: &str) -> Result<Vec<RatingChange>> {
        let handle = AccountHandle::parse(self.platform(), handle)?;
        match self {
            Self::Codeforces(client) => {
                let payload = client.get_rating_changes(&handle).await?;
                parsers::codeforces::parse_rating_changes(&payload.body)
            }
            Self::CodeChef(client) => {
                let payload = client.get_user_page(&handle).await?;
                parsers::codechef::parse_rating_history(&payload.body)
            }
            Self::Timus(_) | Self::ProjectEuler(_) => Err(self.unsupported("rating history")),
        }
    }

    /// Search accounts by name or handle.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        match self {
            Self::Timus(client) => {
                let payload = client.get_search_page(query).await?;
                parsers::timus::parse_search_page(&payload.body)
            }
            Self::CodeChef(client) => {
                let payload = client.get_search_page(query).await?;
                parsers::codechef::parse_search(&payload.body)
            }
            Self::Codeforces(_) | Self::ProjectEuler(_) => Err(self.unsupported("search")),
        }
    }

    /// Fetch everything the sync pipeline stores for an account.
    ///
    /// A missing account yields a `NotFound` profile and no history. A
    /// rate-limited answer is an error so the caller can retry it.
    pub async fn fetch_account(&self, handle: &AccountHandle) -> Result<AccountSnapshot> {
        let platform = self.platform();
        let info = match self {
            Self::CodeChef(client) => {
                // Profile and history share one page.
                let payload = match client.get_user_page(handle).await {
                    Ok(payload) => payload,
                    Err(AppError::NotFound { .. }) => return Ok(missing(platform, handle)),
                    Err(e) => return Err(e),
                };
                let info = parsers::codechef::parse_user_page(handle, &payload.body)?;
                let history = if info.is_found() {
                    Some(parsers::codechef::parse_rating_history(&payload.body)?)
                } else {
                    None
                };
                return Ok(AccountSnapshot { info, history });
            }
            _ => match self.fetch_user_info(handle.as_str()).await {
                Ok(info) => info,
                Err(AppError::NotFound { .. }) => return Ok(missing(platform, handle)),
                Err(e) => return Err(e),
            },
        };

        match info.status {
            UserStatus::RateLimited => return Err(AppError::RateLimited { platform }),
            UserStatus::NotFound => return Ok(AccountSnapshot { info, history: None }),
            UserStatus::Ok => {}
        }

        let history = if platform.has_rating_history() {
            Some(self.fetch_rating_history(handle.as_str()).await?)
        } else {
            None
        };
        Ok(AccountSnapshot { info, history })
    }

    /// The Project Euler client, if this is one.
    pub fn as_euler(&self) -> Option<&EulerClient> {
        match self {
            Self::ProjectEuler(client) => Some(client),
            _ => None,
        }
    }
}

fn missing(platform: PlatformId, handle: &AccountHandle) -> AccountSnapshot {
    AccountSnapshot {
        info: UserInfo::not_found(platform, handle.clone()),
        history: None,
    }
}
