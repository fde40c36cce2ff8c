// src/utils/http.rs

//! HTTP fetch layer.
//!
//! Issues a single GET per call and hands back the status, the final URL
//! after redirects and the body text. Status codes are not interpreted here;
//! each platform client decides which ones it accepts.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// An unparsed response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    /// URL the body was served from, after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl RawPayload {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with `HttpStatus` unless the status is 2xx or listed in `extra`.
    pub fn accept(self, extra: &[u16]) -> Result<Self> {
        if self.is_success() || extra.contains(&self.status) {
            Ok(self)
        } else {
            Err(AppError::HttpStatus {
                status: self.status,
                url: self.url,
            })
        }
    }
}

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))
}

/// Thin GET wrapper shared by every platform client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self::with_client(create_client(config)?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build `url` with `query` appended, without sending anything.
    pub fn build_url(url: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(url)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Issue one GET request.
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<RawPayload> {
        let url = Self::build_url(url, query)?;
        let headers = Self::header_map(headers)?;
        let request_url = url.to_string();

        log::debug!("GET {}", request_url);

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| AppError::from_reqwest(&request_url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::from_reqwest(&request_url, e))?;

        log::debug!("GET {} -> {} ({} bytes)", final_url, status, body.len());

        Ok(RawPayload {
            url: final_url,
            status,
            body,
        })
    }

    fn header_map(headers: &[(&str, &str)]) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::invalid(format!("header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::invalid(format!("header value for '{name}': {e}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_encodes_query() {
        let url = HttpFetcher::build_url(
            "https://timus.online/search.aspx",
            &[("Str", "Gennady K"), ("locale", "en")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://timus.online/search.aspx?Str=Gennady+K&locale=en"
        );
    }

    #[test]
    fn test_build_url_without_query() {
        let url = HttpFetcher::build_url("https://projecteuler.net/news", &[]).unwrap();
        assert_eq!(url.as_str(), "https://projecteuler.net/news");
    }

    #[test]
    fn test_header_map_rejects_bad_names() {
        assert!(HttpFetcher::header_map(&[("x-requested-with", "XMLHttpRequest")]).is_ok());
        assert!(HttpFetcher::header_map(&[("bad header", "v")]).is_err());
    }

    #[test]
    fn test_accept() {
        let payload = |status| RawPayload {
            url: "https://codeforces.com/api/user.info".into(),
            status,
            body: String::new(),
        };
        assert!(payload(200).accept(&[]).is_ok());
        assert!(payload(400).accept(&[400]).is_ok());
        assert!(matches!(
            payload(503).accept(&[400]),
            Err(AppError::HttpStatus { status: 503, .. })
        ));
    }
}
