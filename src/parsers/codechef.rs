// src/parsers/codechef.rs

//! CodeChef search JSON and profile page parsing.

use std::sync::OnceLock;

use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{AccountHandle, PlatformId, RatingChange, SearchHit, UserInfo};
use crate::parsers::{element_text, selector};
use crate::utils::leading_number;

const PLATFORM: PlatformId = PlatformId::CodeChef;

/// CodeChef publishes contest end dates in IST.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    list: Option<Vec<SearchEntry>>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    username: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rating: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    code: String,
    #[serde(default)]
    name: Option<String>,
    rating: Value,
    #[serde(default)]
    rank: Option<Value>,
    end_date: String,
}

/// Ratings arrive as numbers or numeric strings depending on the endpoint.
fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse the ratings search endpoint: `{"list": [{name, username, rating}]}`.
///
/// An empty `list` is an empty result; a body without `list` is a parse
/// failure.
pub fn parse_search(body: &str) -> Result<Vec<SearchHit>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| AppError::parse(PLATFORM, format!("invalid search response: {e}")))?;
    let list = response
        .list
        .ok_or_else(|| AppError::parse(PLATFORM, "search response without list"))?;

    Ok(list
        .into_iter()
        .map(|entry| SearchHit {
            display_name: entry
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| entry.username.clone()),
            rating: entry
                .rating
                .as_ref()
                .and_then(int_value)
                .and_then(|r| i32::try_from(r).ok()),
            solved: None,
            handle: entry.username,
        })
        .collect())
}

/// Parse a profile page (`/users/{handle}`).
pub fn parse_user_page(handle: &AccountHandle, html: &str) -> Result<UserInfo> {
    let document = Html::parse_document(html);

    let profile_sel = selector(PLATFORM, ".user-details-container")?;
    let Some(profile) = document.select(&profile_sel).next() else {
        let text = element_text(&document.root_element()).to_lowercase();
        if text.contains("page not found") || text.contains("user not found") {
            return Ok(UserInfo::not_found(PLATFORM, handle.clone()));
        }
        return Err(AppError::parse(PLATFORM, "profile page without user details"));
    };

    let name_sel = selector(PLATFORM, "header h1, h1.h2-style")?;
    let name = profile
        .select(&name_sel)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();

    let mut info = UserInfo::new(PLATFORM, handle.clone(), name);

    let rating_sel = selector(PLATFORM, ".rating-number")?;
    info.rating = document
        .select(&rating_sel)
        .next()
        .and_then(|el| leading_number(&element_text(&el)))
        .and_then(|r| i32::try_from(r).ok());

    let header_sel = selector(PLATFORM, ".rating-header small, .rating-header")?;
    info.max_rating = document
        .select(&header_sel)
        .map(|el| element_text(&el).to_lowercase())
        .find_map(|text| {
            let (_, rest) = text.split_once("highest rating")?;
            leading_number(rest)
        })
        .and_then(|r| i32::try_from(r).ok());

    Ok(info)
}

fn all_rating_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)var\s+all_rating\s*=\s*(\[.*?\])\s*;").expect("static regex")
    })
}

/// Extract the rating history embedded in a profile page.
///
/// The page carries it as `var all_rating = [...];`. A profile without the
/// array has no rated contests yet and yields an empty history. The array
/// does not include the rating before each contest, so `old_rating` is
/// filled from the preceding entry.
pub fn parse_rating_history(html: &str) -> Result<Vec<RatingChange>> {
    let Some(captures) = all_rating_regex().captures(html) else {
        return Ok(Vec::new());
    };

    let entries: Vec<HistoryEntry> = serde_json::from_str(&captures[1])
        .map_err(|e| AppError::parse(PLATFORM, format!("invalid all_rating array: {e}")))?;

    let ist = FixedOffset::east_opt(IST_OFFSET_SECS)
        .ok_or_else(|| AppError::parse(PLATFORM, "invalid IST offset"))?;

    let mut previous: Option<i32> = None;
    let mut changes = Vec::with_capacity(entries.len());
    for entry in entries {
        let new_rating = int_value(&entry.rating)
            .and_then(|r| i32::try_from(r).ok())
            .ok_or_else(|| AppError::parse(PLATFORM, format!("bad rating in {}", entry.code)))?;

        let naive = NaiveDateTime::parse_from_str(entry.end_date.trim(), "%Y-%m-%d %H:%M:%S")
            .map_err(|e| AppError::parse(PLATFORM, format!("bad end_date in {}: {e}", entry.code)))?;
        let time = ist
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| AppError::parse(PLATFORM, format!("ambiguous end_date in {}", entry.code)))?
            .with_timezone(&Utc);

        changes.push(RatingChange {
            contest_name: entry.name.unwrap_or_else(|| entry.code.clone()),
            contest_id: entry.code,
            old_rating: previous,
            new_rating,
            rank: entry
                .rank
                .as_ref()
                .and_then(int_value)
                .and_then(|r| u32::try_from(r).ok()),
            time,
        });
        previous = Some(new_rating);
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;

    const SEARCH_TOURIST: &str = r#"{"list":[
        {"global_rank":1,"name":"Gennady Korotkevich","username":"tourist","rating":3530,"country":"Belarus"},
        {"global_rank":240,"name":"","username":"tourist_fan","rating":"2301","country":"India"}
    ],"availablePages":1,"totalItems":2}"#;

    const PROFILE_PAGE: &str = r##"<!DOCTYPE html><html><body>
<div class="user-details-container">
  <header><h1 class="h2-style">Gennady Korotkevich</h1></header>
</div>
<div class="rating-header">
  <div class="rating-number">3530?</div>
  <small>(Highest Rating 3818)</small>
</div>
<script>
  var all_rating = [{"code":"COOK01","getyear":"2010","getmonth":"6","getday":"20","reason":null,"penalised_in":null,"rating":"1853","rank":"12","name":"June Cook-Off 2010","end_date":"2010-06-20 23:30:00","color":"#3366CC"},{"code":"LTIME02","getyear":"2010","getmonth":"7","getday":"1","reason":null,"penalised_in":null,"rating":"2024","rank":"3","name":"July Lunchtime","end_date":"2010-07-01 17:30:00","color":"#3366CC"}];
  var other = 1;
</script>
</body></html>"##;

    const NOT_FOUND_PAGE: &str =
        "<!DOCTYPE html><html><body><h1>Page not found</h1></body></html>";

    fn tourist() -> AccountHandle {
        AccountHandle::parse(PLATFORM, "tourist").unwrap()
    }

    #[test]
    fn test_parse_search() {
        let hits = parse_search(SEARCH_TOURIST).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].handle, "tourist");
        assert_eq!(hits[0].display_name, "Gennady Korotkevich");
        assert_eq!(hits[0].rating, Some(3530));
        assert_eq!(hits[1].display_name, "tourist_fan");
        assert_eq!(hits[1].rating, Some(2301));
    }

    #[test]
    fn test_parse_empty_search() {
        let hits = parse_search(r#"{"list":[],"availablePages":0}"#).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_parse_search_without_list() {
        assert!(matches!(
            parse_search(r#"{"status":"error"}"#),
            Err(AppError::Parse { .. })
        ));
        assert!(matches!(
            parse_search("<html>captcha</html>"),
            Err(AppError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_profile() {
        let info = parse_user_page(&tourist(), PROFILE_PAGE).unwrap();
        assert_eq!(info.status, UserStatus::Ok);
        assert_eq!(info.display_name, "Gennady Korotkevich");
        assert_eq!(info.rating, Some(3530));
        assert_eq!(info.max_rating, Some(3818));
    }

    #[test]
    fn test_parse_missing_profile() {
        let info = parse_user_page(&tourist(), NOT_FOUND_PAGE).unwrap();
        assert_eq!(info.status, UserStatus::NotFound);
        assert!(matches!(
            parse_user_page(&tourist(), "<html><body>Under maintenance</body></html>"),
            Err(AppError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_rating_history() {
        let changes = parse_rating_history(PROFILE_PAGE).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].contest_id, "COOK01");
        assert_eq!(changes[0].old_rating, None);
        assert_eq!(changes[0].rank, Some(12));
        assert_eq!(changes[1].old_rating, Some(1853));
        assert_eq!(changes[1].new_rating, 2024);
        // 17:30 IST is 12:00 UTC.
        assert_eq!(changes[1].time.to_rfc3339(), "2010-07-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_rating_history_absent() {
        let changes = parse_rating_history("<html><body>no script</body></html>").unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_parse_rating_history_malformed() {
        let html = "<script>var all_rating = [{\"code\":\"X\"}];</script>";
        assert!(matches!(
            parse_rating_history(html),
            Err(AppError::Parse { .. })
        ));
    }
}
