// src/parsers/codeforces.rs

//! Codeforces API response parsing.
//!
//! Every API method answers with an envelope
//! `{"status": "OK" | "FAILED", "comment": ..., "result": ...}`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{AccountHandle, PlatformId, RatingChange, UserInfo};

const PLATFORM: PlatformId = PlatformId::Codeforces;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUser {
    handle: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    rating: Option<i32>,
    #[serde(default)]
    max_rating: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRatingChange {
    contest_id: i64,
    #[serde(default)]
    contest_name: String,
    #[serde(default)]
    rank: Option<u32>,
    rating_update_time_seconds: i64,
    old_rating: i32,
    new_rating: i32,
}

/// How a `FAILED` envelope should be read.
#[derive(Debug, PartialEq, Eq)]
enum Failure {
    NotFound,
    RateLimited,
    Other(String),
}

fn classify_failure(comment: Option<&str>) -> Failure {
    let comment = comment.unwrap_or_default();
    let lower = comment.to_lowercase();
    if lower.contains("not found") {
        Failure::NotFound
    } else if lower.contains("call limit exceeded") {
        Failure::RateLimited
    } else {
        Failure::Other(comment.to_string())
    }
}

/// Decode the envelope; `Err(failure)` for `FAILED` responses.
fn decode<T: DeserializeOwned>(body: &str) -> Result<std::result::Result<T, Failure>> {
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| AppError::parse(PLATFORM, format!("invalid API response: {e}")))?;

    match envelope.status.as_str() {
        "OK" => envelope
            .result
            .map(Ok)
            .ok_or_else(|| AppError::parse(PLATFORM, "OK response without result")),
        "FAILED" => Ok(Err(classify_failure(envelope.comment.as_deref()))),
        other => Err(AppError::parse(PLATFORM, format!("unknown status '{other}'"))),
    }
}

/// Parse a `user.info` response for `handle`.
pub fn parse_user_info(handle: &AccountHandle, body: &str) -> Result<UserInfo> {
    let users = match decode::<Vec<ApiUser>>(body)? {
        Ok(users) => users,
        Err(Failure::NotFound) => return Ok(UserInfo::not_found(PLATFORM, handle.clone())),
        Err(Failure::RateLimited) => return Ok(UserInfo::rate_limited(PLATFORM, handle.clone())),
        Err(Failure::Other(comment)) => return Err(AppError::parse(PLATFORM, comment)),
    };

    let user = users
        .into_iter()
        .find(|u| u.handle.eq_ignore_ascii_case(handle.as_str()))
        .ok_or_else(|| AppError::parse(PLATFORM, format!("no entry for '{handle}'")))?;

    let full_name = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let display_name = if full_name.is_empty() {
        user.handle.clone()
    } else {
        full_name
    };

    Ok(UserInfo {
        rating: user.rating,
        max_rating: user.max_rating,
        ..UserInfo::new(PLATFORM, handle.clone(), display_name)
    })
}

/// Parse a `user.rating` response, preserving source order.
pub fn parse_rating_changes(body: &str) -> Result<Vec<RatingChange>> {
    let changes = match decode::<Vec<ApiRatingChange>>(body)? {
        Ok(changes) => changes,
        Err(Failure::NotFound) => return Err(AppError::not_found(PLATFORM, "rating history")),
        Err(Failure::RateLimited) => return Err(AppError::RateLimited { platform: PLATFORM }),
        Err(Failure::Other(comment)) => return Err(AppError::parse(PLATFORM, comment)),
    };

    changes
        .into_iter()
        .map(|c| {
            let time = DateTime::<Utc>::from_timestamp(c.rating_update_time_seconds, 0)
                .ok_or_else(|| {
                    AppError::parse(
                        PLATFORM,
                        format!("bad timestamp {}", c.rating_update_time_seconds),
                    )
                })?;
            Ok(RatingChange {
                contest_id: c.contest_id.to_string(),
                contest_name: c.contest_name,
                old_rating: Some(c.old_rating),
                new_rating: c.new_rating,
                rank: c.rank,
                time,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;

    const USER_OK: &str = r#"{"status":"OK","result":[{"lastName":"Korotkevich","country":"Belarus","lastOnlineTimeSeconds":1700000000,"city":"Gomel","rating":3800,"friendOfCount":70000,"titlePhoto":"https://userpic.codeforces.org/422/title/50a270ed4a722867.jpg","handle":"tourist","avatar":"https://userpic.codeforces.org/422/avatar/2b5dbe87f0d859a2.jpg","firstName":"Gennady","contribution":100,"organization":"ITMO University","rank":"legendary grandmaster","maxRating":4009,"registrationTimeSeconds":1265987288,"maxRank":"tourist"}]}"#;

    const USER_NOT_FOUND: &str =
        r#"{"status":"FAILED","comment":"handles: User with handle nobody_xyz not found"}"#;

    const CALL_LIMIT: &str = r#"{"status":"FAILED","comment":"Call limit exceeded"}"#;

    const RATING_OK: &str = r#"{"status":"OK","result":[
        {"contestId":2,"contestName":"Codeforces Beta Round #2","handle":"tourist","rank":14,"ratingUpdateTimeSeconds":1267124400,"oldRating":1602,"newRating":1764},
        {"contestId":8,"contestName":"Codeforces Beta Round #8","handle":"tourist","rank":5,"ratingUpdateTimeSeconds":1270748700,"oldRating":1764,"newRating":1878}
    ]}"#;

    fn tourist() -> AccountHandle {
        AccountHandle::parse(PLATFORM, "tourist").unwrap()
    }

    #[test]
    fn test_parse_user_info() {
        let info = parse_user_info(&tourist(), USER_OK).unwrap();
        assert_eq!(info.display_name, "Gennady Korotkevich");
        assert_eq!(info.rating, Some(3800));
        assert_eq!(info.max_rating, Some(4009));
        assert_eq!(info.status, UserStatus::Ok);
    }

    #[test]
    fn test_parse_user_without_names_uses_handle() {
        let body = r#"{"status":"OK","result":[{"handle":"tourist"}]}"#;
        let info = parse_user_info(&tourist(), body).unwrap();
        assert_eq!(info.display_name, "tourist");
        assert_eq!(info.rating, None);
    }

    #[test]
    fn test_parse_user_not_found() {
        let handle = AccountHandle::parse(PLATFORM, "nobody_xyz").unwrap();
        let info = parse_user_info(&handle, USER_NOT_FOUND).unwrap();
        assert_eq!(info.status, UserStatus::NotFound);
    }

    #[test]
    fn test_parse_user_rate_limited() {
        let info = parse_user_info(&tourist(), CALL_LIMIT).unwrap();
        assert_eq!(info.status, UserStatus::RateLimited);
    }

    #[test]
    fn test_parse_rating_changes_keeps_order() {
        let changes = parse_rating_changes(RATING_OK).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].contest_id, "2");
        assert_eq!(changes[0].old_rating, Some(1602));
        assert_eq!(changes[0].rank, Some(14));
        assert_eq!(changes[1].contest_name, "Codeforces Beta Round #8");
        assert_eq!(changes[1].time.timestamp(), 1270748700);
    }

    #[test]
    fn test_parse_rating_changes_empty() {
        let changes = parse_rating_changes(r#"{"status":"OK","result":[]}"#).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_parse_rating_failures() {
        assert!(matches!(
            parse_rating_changes(USER_NOT_FOUND),
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            parse_rating_changes(CALL_LIMIT),
            Err(AppError::RateLimited { .. })
        ));
        assert!(matches!(
            parse_rating_changes(r#"{"status":"FAILED","comment":"Internal error"}"#),
            Err(AppError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_rating_changes("<html>maintenance</html>"),
            Err(AppError::Parse { .. })
        ));
        assert!(matches!(
            parse_user_info(&tourist(), r#"{"status":"OK"}"#),
            Err(AppError::Parse { .. })
        ));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        assert_eq!(
            parse_rating_changes(RATING_OK).unwrap(),
            parse_rating_changes(RATING_OK).unwrap()
        );
    }
}
