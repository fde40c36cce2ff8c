//! Every item the tracker persists.
//!
//! Keys follow `platform/role[/handle]`:
//!
//! | Key                           | Value               |
//! |-------------------------------|---------------------|
//! | `{platform}/tracked`          | `TrackedAccounts`   |
//! | `{platform}/user/{handle}`    | `UserInfo`          |
//! | `{platform}/rating/{handle}`  | `RatingHistory`     |
//! | `{platform}/sync/{handle}`    | `SyncState`         |
//! | `projecteuler/news`           | `Vec<NewsEntry>`    |
//! | `projecteuler/recent`         | `Vec<RecentProblem>`|

use crate::error::Result;
use crate::models::{
    Account, NewsEntry, PlatformId, RatingHistory, RecentProblem, SyncState, TrackedAccounts,
    UserInfo,
};
use crate::storage::{Item, ItemKey};

const USER_INFO_SCHEMA: u32 = 1;
const RATING_SCHEMA: u32 = 1;
const SYNC_SCHEMA: u32 = 1;
const TRACKED_SCHEMA: u32 = 1;
const EULER_SCHEMA: u32 = 1;

fn account_item<T>(account: &Account, role: &str, schema: u32) -> Result<Item<T>> {
    let key = ItemKey::from_segments(&[account.platform.as_str(), role, account.handle.as_str()])?;
    Ok(Item::new(key, schema))
}

pub fn tracked(platform: PlatformId) -> Result<Item<TrackedAccounts>> {
    let key = ItemKey::from_segments(&[platform.as_str(), "tracked"])?;
    Ok(Item::new(key, TRACKED_SCHEMA))
}

pub fn user_info(account: &Account) -> Result<Item<UserInfo>> {
    account_item(account, "user", USER_INFO_SCHEMA)
}

pub fn rating_history(account: &Account) -> Result<Item<RatingHistory>> {
    account_item(account, "rating", RATING_SCHEMA)
}

pub fn sync_state(account: &Account) -> Result<Item<SyncState>> {
    account_item(account, "sync", SYNC_SCHEMA)
}

pub fn euler_news() -> Result<Item<Vec<NewsEntry>>> {
    let key = ItemKey::from_segments(&[PlatformId::ProjectEuler.as_str(), "news"])?;
    Ok(Item::new(key, EULER_SCHEMA))
}

pub fn euler_recent() -> Result<Item<Vec<RecentProblem>>> {
    let key = ItemKey::from_segments(&[PlatformId::ProjectEuler.as_str(), "recent"])?;
    Ok(Item::new(key, EULER_SCHEMA))
}
