// src/services/euler.rs

//! Project Euler archive client.
//!
//! The archive has no public account pages, only site-wide content: news,
//! the recent problems list, problem statements and an RSS feed.

use crate::error::{AppError, Result};
use crate::models::{NewsEntry, PlatformId, ProblemInfo, RecentProblem};
use crate::parsers::euler;
use crate::services::endpoint;
use crate::utils::http::{HttpFetcher, RawPayload};

#[derive(Debug, Clone)]
pub struct EulerClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl EulerClient {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn problem_url(&self, id: u32) -> Result<String> {
        if id == 0 {
            return Err(AppError::invalid("projecteuler: problem ids start at 1"));
        }
        Ok(endpoint(&self.base_url, &format!("problem={id}")))
    }

    async fn get_path(&self, path: &str) -> Result<RawPayload> {
        self.fetcher
            .get(&endpoint(&self.base_url, path), &[], &[])
            .await?
            .accept(&[])
    }

    /// `GET /news`
    pub async fn get_news_page(&self) -> Result<RawPayload> {
        self.get_path("news").await
    }

    /// `GET /recent`
    pub async fn get_recent_page(&self) -> Result<RawPayload> {
        self.get_path("recent").await
    }

    /// `GET /problem={id}`
    pub async fn get_problem_page(&self, id: u32) -> Result<RawPayload> {
        let url = self.problem_url(id)?;
        let payload = self.fetcher.get(&url, &[], &[]).await?;
        if payload.status == 404 {
            return Err(AppError::not_found(
                PlatformId::ProjectEuler,
                format!("problem {id}"),
            ));
        }
        payload.accept(&[])
    }

    /// `GET /rss2_euler.xml`
    pub async fn get_rss_feed(&self) -> Result<RawPayload> {
        self.get_path("rss2_euler.xml").await
    }

    pub async fn fetch_news(&self) -> Result<Vec<NewsEntry>> {
        euler::parse_news_page(&self.get_news_page().await?.body)
    }

    pub async fn fetch_recent(&self) -> Result<Vec<RecentProblem>> {
        euler::parse_recent_page(&self.get_recent_page().await?.body)
    }

    pub async fn fetch_problem(&self, id: u32) -> Result<ProblemInfo> {
        euler::parse_problem_page(id, &self.get_problem_page(id).await?.body)
    }

    pub async fn fetch_feed(&self) -> Result<Vec<NewsEntry>> {
        euler::parse_rss(self.get_rss_feed().await?.body.as_bytes())
    }
}
