// src/services/timus.rs

//! Timus Online Judge client.
//!
//! Timus answers 200 for unknown authors and empty searches; the parser
//! reads those cases from the page body.

use crate::error::Result;
use crate::models::AccountHandle;
use crate::services::{endpoint, search_query};
use crate::utils::http::{HttpFetcher, RawPayload};

const LOCALE: (&str, &str) = ("locale", "en");

#[derive(Debug, Clone)]
pub struct TimusClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl TimusClient {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn author_url(&self) -> String {
        endpoint(&self.base_url, "author.aspx")
    }

    pub fn search_url(&self) -> String {
        endpoint(&self.base_url, "search.aspx")
    }

    /// `GET /author.aspx?id={id}&locale=en`
    pub async fn get_user_page(&self, id: &AccountHandle) -> Result<RawPayload> {
        self.fetcher
            .get(&self.author_url(), &[("id", id.as_str()), LOCALE], &[])
            .await?
            .accept(&[])
    }

    /// `GET /search.aspx?Str={query}&locale=en`
    pub async fn get_search_page(&self, query: &str) -> Result<RawPayload> {
        let query = search_query(query)?;
        self.fetcher
            .get(&self.search_url(), &[("Str", query), LOCALE], &[])
            .await?
            .accept(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::HttpConfig;

    fn client() -> TimusClient {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        TimusClient::new(fetcher, "https://timus.online")
    }

    #[test]
    fn test_urls() {
        let client = client();
        assert_eq!(client.author_url(), "https://timus.online/author.aspx");
        let url =
            HttpFetcher::build_url(&client.author_url(), &[("id", "12345"), LOCALE]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://timus.online/author.aspx?id=12345&locale=en"
        );
    }

    #[tokio::test]
    async fn test_blank_search_rejected_before_request() {
        let err = client().get_search_page("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
