//! In-memory backend for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::storage::{Envelope, ItemBackend, ItemKey};

/// Envelopes kept in a shared map. Clones share the same map, so a store
/// can be "reopened" over the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    items: Arc<Mutex<HashMap<ItemKey, Envelope>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put`/`remove` fail, simulating a broken disk.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, key: &ItemKey) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(AppError::storage(key.as_str(), "write failure injected"))
        } else {
            Ok(())
        }
    }

    fn map(&self, key: &ItemKey) -> Result<std::sync::MutexGuard<'_, HashMap<ItemKey, Envelope>>> {
        self.items
            .lock()
            .map_err(|_| AppError::storage(key.as_str(), "memory backend poisoned"))
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ItemBackend for MemoryBackend {
    async fn load_all(&self) -> Result<Vec<Envelope>> {
        let items = self
            .items
            .lock()
            .map_err(|_| AppError::storage("*", "memory backend poisoned"))?;
        Ok(items.values().cloned().collect())
    }

    async fn put(&self, envelope: &Envelope) -> Result<()> {
        self.check_writable(&envelope.key)?;
        self.map(&envelope.key)?
            .insert(envelope.key.clone(), envelope.clone());
        Ok(())
    }

    async fn remove(&self, key: &ItemKey) -> Result<()> {
        self.check_writable(key)?;
        self.map(key)?.remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
