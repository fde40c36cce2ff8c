// src/pipeline/sync.rs

//! Account sync: fetch, parse, merge and store.
//!
//! One sync cycle per account fetches the profile (and rating history where
//! the platform keeps one), merges it into the store and records the
//! outcome in the account's `SyncState`. Accounts run concurrently up to
//! `sync.max_concurrent`; two cycles for the same account never overlap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{
    Account, Config, NewsEntry, PlatformId, RatingHistory, SyncConfig, SyncState, TrackedAccounts,
    UserStatus,
};
use crate::pipeline::diff::{RatingDiff, calculate_diff};
use crate::pipeline::retry::RetryPolicy;
use crate::services::{AccountSnapshot, EulerClient, PlatformClient};
use crate::storage::{ItemStore, items};

/// What one successful sync cycle changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    pub status: UserStatus,
    pub rating: Option<i32>,
    pub diff: RatingDiff,
    /// Fetch attempts made, including retries
    pub attempts: u32,
}

/// Result of syncing one account.
#[derive(Debug)]
pub struct SyncOutcome {
    pub account: Account,
    pub result: Result<SyncSummary>,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Results of a batch sync, in completion order.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Rating changes seen for the first time in this batch.
    pub fn new_changes(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.diff.added.len())
            .sum()
    }

    pub fn get(&self, account: &Account) -> Option<&SyncOutcome> {
        self.outcomes.iter().find(|o| &o.account == account)
    }
}

/// A sync running in the background.
///
/// Aborting it stops the cycle at its next await point; anything already
/// committed stays, and the store never sees a partial write.
pub struct SyncTask {
    account: Account,
    handle: JoinHandle<SyncOutcome>,
}

impl SyncTask {
    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn abort(&self) {
        log::debug!("Aborting sync of {}", self.account);
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the outcome; `None` if the task was aborted.
    pub async fn join(self) -> Option<SyncOutcome> {
        match self.handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) if e.is_cancelled() => None,
            Err(e) => Some(SyncOutcome {
                account: self.account,
                result: Err(AppError::storage("sync", format!("sync task panicked: {e}"))),
            }),
        }
    }
}

/// What a Project Euler refresh found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EulerDigest {
    /// News entries not seen in the previous refresh
    pub new_entries: Vec<NewsEntry>,
    pub total_entries: usize,
    pub recent_problems: usize,
}

struct SyncerInner {
    store: ItemStore,
    clients: HashMap<PlatformId, PlatformClient>,
    policy: RetryPolicy,
    max_concurrent: usize,
    request_delay: Duration,
    locks: LockTable,
}

type LockTable = Mutex<HashMap<Account, Arc<AsyncMutex<()>>>>;

/// Held while a cycle (or untrack) runs for one account.
struct AccountGuard<'a> {
    locks: &'a LockTable,
    account: Account,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        if let Ok(mut locks) = self.locks.lock() {
            if locks
                .get(&self.account)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                locks.remove(&self.account);
            }
        }
    }
}

/// Drives sync cycles against an [`ItemStore`].
#[derive(Clone)]
pub struct Syncer {
    inner: Arc<SyncerInner>,
}

impl Syncer {
    pub fn new(store: ItemStore, clients: Vec<PlatformClient>, config: &SyncConfig) -> Self {
        Self::with_policy(store, clients, config, RetryPolicy::from_config(&config.retry))
    }

    /// Like [`Syncer::new`], but with an explicit retry policy instead of
    /// `config.retry`.
    pub fn with_policy(
        store: ItemStore,
        clients: Vec<PlatformClient>,
        config: &SyncConfig,
        policy: RetryPolicy,
    ) -> Self {
        let clients = clients
            .into_iter()
            .map(|client| (client.platform(), client))
            .collect();
        Self {
            inner: Arc::new(SyncerInner {
                store,
                clients,
                policy,
                max_concurrent: config.max_concurrent.max(1),
                request_delay: Duration::from_millis(config.request_delay_ms),
                locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// A syncer with one client per platform, built from `config`.
    pub fn from_config(config: &Config, store: ItemStore) -> Result<Self> {
        Ok(Self::new(store, PlatformClient::all(config)?, &config.sync))
    }

    pub fn store(&self) -> &ItemStore {
        &self.inner.store
    }

    fn client(&self, platform: PlatformId) -> Result<&PlatformClient> {
        self.inner
            .clients
            .get(&platform)
            .ok_or_else(|| AppError::config(format!("no client configured for {platform}")))
    }

    /// Serialize work on `account`. The table entry is dropped again once
    /// no one holds or waits for it.
    async fn lock_account(&self, account: &Account) -> Result<AccountGuard<'_>> {
        let lock = {
            let mut locks = self.inner.locks.lock().map_err(|_| {
                AppError::storage(account.to_string(), "account lock table poisoned")
            })?;
            Arc::clone(
                locks
                    .entry(account.clone())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let guard = lock.lock_owned().await;
        Ok(AccountGuard {
            locks: &self.inner.locks,
            account: account.clone(),
            guard: Some(guard),
        })
    }

    /// Start tracking `account`. Returns false if it was already tracked.
    pub async fn track(&self, account: &Account) -> Result<bool> {
        let item = items::tracked(account.platform)?;
        let added = self
            .store()
            .try_update(&item, |current| {
                let mut tracked = current.unwrap_or_default();
                Ok(tracked.add(account.handle.clone()).then_some(tracked))
            })
            .await?;
        Ok(added.is_some())
    }

    /// Stop tracking `account` and drop its stored data.
    pub async fn untrack(&self, account: &Account) -> Result<bool> {
        let item = items::tracked(account.platform)?;
        let removed = self
            .store()
            .try_update(&item, |current: Option<TrackedAccounts>| {
                let Some(mut tracked) = current else {
                    return Ok(None);
                };
                Ok(tracked.remove(&account.handle).then_some(tracked))
            })
            .await?
            .is_some();

        if removed {
            let _guard = self.lock_account(account).await?;
            self.store().delete(&items::user_info(account)?).await?;
            self.store().delete(&items::rating_history(account)?).await?;
            self.store().delete(&items::sync_state(account)?).await?;
        }
        Ok(removed)
    }

    /// Tracked accounts on `platform`, in the order they were added.
    pub fn tracked(&self, platform: PlatformId) -> Result<Vec<Account>> {
        let tracked = self
            .store()
            .read(&items::tracked(platform)?)?
            .unwrap_or_default();
        Ok(tracked
            .handles
            .into_iter()
            .map(|handle| Account { platform, handle })
            .collect())
    }

    /// Tracked accounts on every platform.
    pub fn tracked_all(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for platform in PlatformId::ALL {
            if platform.supports_accounts() {
                accounts.extend(self.tracked(platform)?);
            }
        }
        Ok(accounts)
    }

    /// Run one sync cycle for `account`.
    pub async fn sync_account(&self, account: &Account) -> SyncOutcome {
        SyncOutcome {
            account: account.clone(),
            result: self.run_cycle(account).await,
        }
    }

    async fn run_cycle(&self, account: &Account) -> Result<SyncSummary> {
        let _guard = self.lock_account(account).await?;

        let client = self.client(account.platform)?;
        let label = format!("sync {account}");
        let (fetched, attempts) = self
            .inner
            .policy
            .run(&label, || client.fetch_account(&account.handle))
            .await;

        match fetched {
            Ok(snapshot) => {
                let summary = self.commit(account, snapshot, attempts).await?;
                self.record(account, None).await?;
                Ok(summary)
            }
            Err(err) => {
                if let AppError::Parse { platform, .. } = &err {
                    log::warn!("{} page could not be parsed for {}: {}", platform, account, err);
                } else {
                    log::warn!("Sync of {} failed after {} attempts: {}", account, attempts, err);
                }
                self.record(account, Some(&err)).await?;
                Err(err)
            }
        }
    }

    /// Store a fetched snapshot and work out what changed.
    async fn commit(
        &self,
        account: &Account,
        snapshot: AccountSnapshot,
        attempts: u32,
    ) -> Result<SyncSummary> {
        let AccountSnapshot { info, history } = snapshot;
        let store = self.store();

        if info.status == UserStatus::NotFound {
            log::warn!("{} no longer exists; keeping its rating history", account);
        }
        store.write(&items::user_info(account)?, &info).await?;

        let mut diff = RatingDiff::default();
        if let Some(incoming) = history {
            let item = items::rating_history(account)?;
            store
                .try_update(&item, |current: Option<RatingHistory>| {
                    let existed = current.is_some();
                    let mut history = current.unwrap_or_default();
                    let previous = history.changes.clone();
                    let changed = history.merge(incoming);
                    diff = calculate_diff(&previous, &history.changes);
                    Ok((changed || !existed).then_some(history))
                })
                .await?;
        }

        if diff.has_changes() {
            log::info!(
                "{}: {} new and {} corrected rating changes",
                account,
                diff.added.len(),
                diff.corrected.len()
            );
        }

        Ok(SyncSummary {
            status: info.status,
            rating: info.rating,
            diff,
            attempts,
        })
    }

    async fn record(&self, account: &Account, err: Option<&AppError>) -> Result<()> {
        let now = Utc::now();
        self.store()
            .update(&items::sync_state(account)?, |state: Option<SyncState>| {
                let state = state.unwrap_or_default();
                match err {
                    Some(err) => state.record_failure(err, now),
                    None => state.record_success(now),
                }
            })
            .await?;
        Ok(())
    }

    /// Sync `accounts` concurrently. A failure for one account never stops
    /// or alters the others.
    pub async fn sync_all(&self, accounts: Vec<Account>) -> SyncReport {
        let mut report = SyncReport::default();
        let delay = self.inner.request_delay;
        let max_concurrent = self.inner.max_concurrent;

        // Accounts beyond the first batch wait `delay` before fetching.
        let mut outcomes = stream::iter(accounts.into_iter().enumerate())
            .map(|(i, account)| async move {
                if i >= max_concurrent && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.sync_account(&account).await
            })
            .buffer_unordered(max_concurrent);

        while let Some(outcome) = outcomes.next().await {
            match &outcome.result {
                Ok(summary) => log::debug!(
                    "Synced {} ({} new changes)",
                    outcome.account,
                    summary.diff.added.len()
                ),
                Err(err) => log::debug!("Sync of {} failed: {}", outcome.account, err),
            }
            report.outcomes.push(outcome);
        }

        log::info!(
            "Sync finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    /// Sync every tracked account.
    pub async fn sync_tracked(&self) -> Result<SyncReport> {
        Ok(self.sync_all(self.tracked_all()?).await)
    }

    /// Run a sync for `account` in the background.
    pub fn spawn(&self, account: Account) -> SyncTask {
        let syncer = self.clone();
        let target = account.clone();
        let handle = tokio::spawn(async move { syncer.sync_account(&target).await });
        SyncTask { account, handle }
    }

    fn euler(&self) -> Result<&EulerClient> {
        self.client(PlatformId::ProjectEuler)?
            .as_euler()
            .ok_or_else(|| AppError::config("projecteuler client is misconfigured"))
    }

    /// Refresh the cached Project Euler news and recent problems.
    ///
    /// The news page is the primary source; the RSS feed is used when the
    /// page cannot be parsed.
    pub async fn refresh_euler(&self) -> Result<EulerDigest> {
        let client = self.euler()?;
        let policy = &self.inner.policy;

        let (news, _) = policy.run("projecteuler news", || client.fetch_news()).await;
        let news = match news {
            Ok(news) => news,
            Err(err @ AppError::Parse { .. }) => {
                log::warn!("News page unreadable ({}); falling back to RSS", err);
                policy.run("projecteuler rss", || client.fetch_feed()).await.0?
            }
            Err(err) => return Err(err),
        };
        let (recent, _) = policy
            .run("projecteuler recent", || client.fetch_recent())
            .await;
        let recent = recent?;

        let mut digest = EulerDigest {
            total_entries: news.len(),
            recent_problems: recent.len(),
            ..EulerDigest::default()
        };

        let store = self.store();
        store
            .try_update(&items::euler_news()?, |current: Option<Vec<NewsEntry>>| {
                let previous = current.unwrap_or_default();
                digest.new_entries = news
                    .iter()
                    .filter(|entry| !previous.iter().any(|p| p.title == entry.title))
                    .cloned()
                    .collect();
                Ok((previous != news).then_some(news))
            })
            .await?;
        store.write(&items::euler_recent()?, &recent).await?;

        Ok(digest)
    }

    /// Wait for in-flight commits and close the store.
    pub async fn shutdown(&self) -> Result<()> {
        self.store().close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpConfig;
    use crate::storage::MemoryBackend;

    async fn syncer() -> Syncer {
        let store = ItemStore::open(MemoryBackend::new()).await.unwrap();
        Syncer::from_config(&Config::default(), store).unwrap()
    }

    #[tokio::test]
    async fn test_track_and_untrack() {
        let syncer = syncer().await;
        let tourist = Account::new(PlatformId::Codeforces, "tourist").unwrap();
        let petr = Account::new(PlatformId::Codeforces, "Petr").unwrap();

        assert!(syncer.track(&tourist).await.unwrap());
        assert!(!syncer.track(&tourist).await.unwrap());
        let shouting = Account::new(PlatformId::Codeforces, "TOURIST").unwrap();
        assert!(!syncer.track(&shouting).await.unwrap());
        assert!(syncer.track(&petr).await.unwrap());
        assert_eq!(
            syncer.tracked(PlatformId::Codeforces).unwrap(),
            vec![tourist.clone(), petr.clone()]
        );

        assert!(syncer.untrack(&tourist).await.unwrap());
        assert!(!syncer.untrack(&tourist).await.unwrap());
        assert_eq!(syncer.tracked_all().unwrap(), vec![petr]);
        assert!(syncer.inner.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_client_is_reported() {
        let store = ItemStore::open(MemoryBackend::new()).await.unwrap();
        let fetcher = crate::utils::http::HttpFetcher::new(&HttpConfig::default()).unwrap();
        let timus_only = PlatformClient::new(
            PlatformId::Timus,
            fetcher,
            &Config::default().platforms,
        );
        let syncer = Syncer::new(store, vec![timus_only], &SyncConfig::default());

        let account = Account::new(PlatformId::Codeforces, "tourist").unwrap();
        let outcome = syncer.sync_account(&account).await;
        assert!(matches!(outcome.result, Err(AppError::Config(_))));
        assert!(syncer.inner.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lock_entry_outlives_guard_while_contended() {
        let syncer = syncer().await;
        let account = Account::new(PlatformId::Codeforces, "tourist").unwrap();

        let first = syncer.lock_account(&account).await.unwrap();
        let waiter = {
            let syncer = syncer.clone();
            let account = account.clone();
            tokio::spawn(async move {
                let _guard = syncer.lock_account(&account).await.unwrap();
            })
        };
        tokio::task::yield_now().await;
        drop(first);
        assert!(syncer.inner.locks.lock().unwrap().len() <= 1);

        waiter.await.unwrap();
        assert!(syncer.inner.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_report_counts() {
        let ok = |handle: &str, added: usize| SyncOutcome {
            account: Account::new(PlatformId::CodeChef, handle).unwrap(),
            result: Ok(SyncSummary {
                status: UserStatus::Ok,
                rating: None,
                diff: RatingDiff {
                    added: vec![
                        crate::models::RatingChange {
                            contest_id: "X".into(),
                            contest_name: String::new(),
                            old_rating: None,
                            new_rating: 1500,
                            rank: None,
                            time: Utc::now(),
                        };
                        added
                    ],
                    corrected: Vec::new(),
                },
                attempts: 1,
            }),
        };
        let report = SyncReport {
            outcomes: vec![
                ok("a", 2),
                ok("b", 1),
                SyncOutcome {
                    account: Account::new(PlatformId::CodeChef, "c").unwrap(),
                    result: Err(AppError::invalid("x")),
                },
            ],
        };
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.new_changes(), 3);
    }
}
