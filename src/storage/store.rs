//! The item store: cache, per-key locking and commit.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, watch};

use crate::error::{AppError, Result};
use crate::storage::{Envelope, Item, ItemBackend, ItemKey, ItemWatch, LocalBackend};

/// Per-key state: the write lock and the published value.
#[derive(Clone)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    tx: Arc<watch::Sender<Option<Arc<Envelope>>>>,
}

impl Slot {
    fn new(value: Option<Arc<Envelope>>) -> Self {
        Self {
            lock: Arc::new(AsyncMutex::new(())),
            tx: Arc::new(watch::Sender::new(value)),
        }
    }

    fn current(&self) -> Option<Arc<Envelope>> {
        self.tx.borrow().clone()
    }

    /// No value, no watchers, and nobody holding or waiting on the lock.
    fn is_idle(&self) -> bool {
        self.tx.borrow().is_none()
            && self.tx.receiver_count() == 0
            && Arc::strong_count(&self.lock) == 1
    }
}

struct Inner {
    backend: Arc<dyn ItemBackend>,
    slots: Mutex<HashMap<ItemKey, Slot>>,
    closed: AtomicBool,
}

/// Typed key-value store with live observation.
///
/// Reads are served from memory. Writes to one key are serialized by a
/// per-key async lock; writes to different keys never wait on each other.
/// Each commit (backend write, then cache publish) runs in its own task
/// holding the key's lock, so a caller that gives up mid-write cannot leave
/// the cache and the backend disagreeing.
#[derive(Clone)]
pub struct ItemStore {
    inner: Arc<Inner>,
}

impl ItemStore {
    /// Open a store over `backend`, loading every persisted item.
    pub async fn open(backend: impl ItemBackend + 'static) -> Result<Self> {
        Self::open_shared(Arc::new(backend)).await
    }

    /// Open a store over the local backend rooted at `data_dir`.
    pub async fn open_local(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(LocalBackend::new(data_dir.as_ref())).await
    }

    pub async fn open_shared(backend: Arc<dyn ItemBackend>) -> Result<Self> {
        let removed = backend.cleanup().await?;
        if removed > 0 {
            log::warn!("Discarded {} interrupted writes in {}", removed, backend.describe());
        }

        let slots: HashMap<ItemKey, Slot> = backend
            .load_all()
            .await?
            .into_iter()
            .map(|envelope| (envelope.key.clone(), Slot::new(Some(Arc::new(envelope)))))
            .collect();

        log::info!("Opened item store at {} ({} items)", backend.describe(), slots.len());

        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                slots: Mutex::new(slots),
                closed: AtomicBool::new(false),
            }),
        })
    }

    fn slots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<ItemKey, Slot>>> {
        self.inner
            .slots
            .lock()
            .map_err(|_| AppError::storage("*", "slot table poisoned"))
    }

    /// The slot for `key`, created empty on first use.
    fn slot(&self, key: &ItemKey) -> Result<Slot> {
        Ok(self
            .slots()?
            .entry(key.clone())
            .or_insert_with(|| Slot::new(None))
            .clone())
    }

    /// Drop slots nothing refers to any more.
    fn prune_idle(&self) -> Result<()> {
        let mut slots = self.slots()?;
        let before = slots.len();
        slots.retain(|_, slot| !slot.is_idle());
        if slots.len() < before {
            log::debug!("Pruned {} idle item slots", before - slots.len());
        }
        Ok(())
    }

    fn ensure_open(&self, key: &ItemKey) -> Result<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            Err(AppError::storage(key.as_str(), "store is closed"))
        } else {
            Ok(())
        }
    }

    /// Take the key's write lock.
    async fn lock(&self, key: &ItemKey) -> Result<(Slot, OwnedMutexGuard<()>)> {
        self.ensure_open(key)?;
        let slot = self.slot(key)?;
        let guard = Arc::clone(&slot.lock).lock_owned().await;
        // Closed while we waited.
        self.ensure_open(key)?;
        Ok((slot, guard))
    }

    fn envelope<T: Serialize>(item: &Item<T>, value: &T) -> Result<Envelope> {
        Ok(Envelope {
            key: item.key().clone(),
            schema: item.schema(),
            updated_at: Utc::now(),
            value: serde_json::to_value(value)?,
        })
    }

    /// Persist `next` (or remove the item when `None`) and publish it.
    async fn commit(
        &self,
        slot: Slot,
        guard: OwnedMutexGuard<()>,
        key: &ItemKey,
        next: Option<Envelope>,
    ) -> Result<()> {
        let backend = Arc::clone(&self.inner.backend);
        let target = key.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            match next {
                Some(envelope) => {
                    backend.put(&envelope).await?;
                    slot.tx.send_replace(Some(Arc::new(envelope)));
                }
                None => {
                    backend.remove(&target).await?;
                    slot.tx.send_replace(None);
                }
            }
            Ok::<(), AppError>(())
        });

        task.await
            .map_err(|e| AppError::storage(key.as_str(), format!("commit task failed: {e}")))?
    }

    /// Current value of `item`, from memory.
    pub fn read<T: DeserializeOwned>(&self, item: &Item<T>) -> Result<Option<T>> {
        let envelope = self.slots()?.get(item.key()).and_then(Slot::current);
        item.decode(envelope.as_deref())
    }

    /// When `item` was last written, if present.
    pub fn updated_at<T>(&self, item: &Item<T>) -> Result<Option<chrono::DateTime<Utc>>> {
        Ok(self
            .slots()?
            .get(item.key())
            .and_then(Slot::current)
            .map(|envelope| envelope.updated_at))
    }

    /// Subscribe to `item`; the watch starts at the current value.
    pub fn watch<T: DeserializeOwned>(&self, item: &Item<T>) -> Result<ItemWatch<T>> {
        self.prune_idle()?;
        let slot = self.slot(item.key())?;
        Ok(ItemWatch::new(item.clone(), slot.tx.subscribe()))
    }

    /// Replace the value of `item`.
    pub async fn write<T: Serialize>(&self, item: &Item<T>, value: &T) -> Result<()> {
        let envelope = Self::envelope(item, value)?;
        let (slot, guard) = self.lock(item.key()).await?;
        self.commit(slot, guard, item.key(), Some(envelope)).await
    }

    /// Read-modify-write under the key's lock. Returns the committed value.
    pub async fn update<T, F>(&self, item: &Item<T>, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let (slot, guard) = self.lock(item.key()).await?;
        let next = f(item.decode(slot.current().as_deref())?);
        let envelope = Self::envelope(item, &next)?;
        self.commit(slot, guard, item.key(), Some(envelope)).await?;
        Ok(next)
    }

    /// Like [`ItemStore::update`], but `f` may fail or decline.
    ///
    /// `Err` aborts without writing and is returned as is; `Ok(None)` leaves
    /// the item untouched.
    pub async fn try_update<T, F>(&self, item: &Item<T>, f: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> Result<Option<T>>,
    {
        let (slot, guard) = self.lock(item.key()).await?;
        let Some(next) = f(item.decode(slot.current().as_deref())?)? else {
            return Ok(None);
        };
        let envelope = Self::envelope(item, &next)?;
        self.commit(slot, guard, item.key(), Some(envelope)).await?;
        Ok(Some(next))
    }

    /// Remove `item`. Returns whether it was present.
    pub async fn delete<T>(&self, item: &Item<T>) -> Result<bool> {
        let (slot, guard) = self.lock(item.key()).await?;
        let existed = slot.current().is_some();
        self.commit(slot, guard, item.key(), None).await?;
        self.prune_idle()?;
        Ok(existed)
    }

    /// Keys of every present item, sorted.
    pub fn keys(&self) -> Result<Vec<ItemKey>> {
        let mut keys: Vec<ItemKey> = self
            .slots()?
            .iter()
            .filter(|(_, slot)| slot.current().is_some())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    pub fn describe(&self) -> String {
        self.inner.backend.describe()
    }

    /// Refuse new writes and wait for in-flight commits to finish.
    pub async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        let locks: Vec<Arc<AsyncMutex<()>>> = self
            .slots()?
            .values()
            .map(|slot| Arc::clone(&slot.lock))
            .collect();
        for lock in locks {
            drop(lock.lock().await);
        }
        log::debug!("Closed item store at {}", self.describe());
        Ok(())
    }
}
