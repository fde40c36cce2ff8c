// src/services/codeforces.rs

//! Codeforces JSON API client.

use crate::error::Result;
use crate::models::AccountHandle;
use crate::services::endpoint;
use crate::utils::http::{HttpFetcher, RawPayload};

/// The API reports failures (unknown handle, call limit) as a 400 with a
/// JSON `FAILED` envelope, so 400 bodies go to the parser too.
const ACCEPTED: [u16; 1] = [400];

#[derive(Debug, Clone)]
pub struct CodeforcesClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl CodeforcesClient {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn user_info_url(&self) -> String {
        endpoint(&self.base_url, "api/user.info")
    }

    pub fn rating_url(&self) -> String {
        endpoint(&self.base_url, "api/user.rating")
    }

    /// `GET /api/user.info?handles={handle}`
    pub async fn get_user_info(&self, handle: &AccountHandle) -> Result<RawPayload> {
        self.fetcher
            .get(&self.user_info_url(), &[("handles", handle.as_str())], &[])
            .await?
            .accept(&ACCEPTED)
    }

    /// `GET /api/user.rating?handle={handle}`
    pub async fn get_rating_changes(&self, handle: &AccountHandle) -> Result<RawPayload> {
        self.fetcher
            .get(&self.rating_url(), &[("handle", handle.as_str())], &[])
            .await?
            .accept(&ACCEPTED)
    }
}
