// src/services/codechef.rs

//! CodeChef client: ratings search API and profile pages.

use crate::error::{AppError, Result};
use crate::models::{AccountHandle, PlatformId};
use crate::services::{endpoint, search_query};
use crate::utils::http::{HttpFetcher, RawPayload};

/// The ratings API only answers requests that look like the site's own XHR.
const XHR_HEADER: (&str, &str) = ("x-requested-with", "XMLHttpRequest");

#[derive(Debug, Clone)]
pub struct CodeChefClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl CodeChefClient {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn user_url(&self, handle: &AccountHandle) -> String {
        endpoint(&self.base_url, &format!("users/{handle}"))
    }

    pub fn search_url(&self) -> String {
        endpoint(&self.base_url, "api/ratings/all")
    }

    /// `GET /users/{handle}`
    ///
    /// A 404, or a redirect that lands outside `/users/` (the site sends
    /// unknown handles to its home page), is `NotFound`.
    pub async fn get_user_page(&self, handle: &AccountHandle) -> Result<RawPayload> {
        let payload = self.fetcher.get(&self.user_url(handle), &[], &[]).await?;
        if payload.status == 404 || !payload.url.contains("/users/") {
            return Err(AppError::not_found(
                PlatformId::CodeChef,
                format!("user '{handle}'"),
            ));
        }
        payload.accept(&[])
    }

    /// `GET /api/ratings/all?...&search={query}`
    pub async fn get_search_page(&self, query: &str) -> Result<RawPayload> {
        let query = search_query(query)?;
        self.fetcher
            .get(
                &self.search_url(),
                &[
                    ("sortBy", "global_rank"),
                    ("order", "asc"),
                    ("page", "1"),
                    ("itemsPerPage", "40"),
                    ("search", query),
                ],
                &[XHR_HEADER],
            )
            .await?
            .accept(&[])
    }
}
