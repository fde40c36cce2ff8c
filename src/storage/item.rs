//! Typed item handles and live observation.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::storage::{Envelope, ItemKey};

/// A key bound to the type stored under it and that type's schema version.
///
/// Bump `schema` when the stored shape changes; readers still decode older
/// envelopes, with serde defaults filling new fields.
pub struct Item<T> {
    key: ItemKey,
    schema: u32,
    _value: PhantomData<fn() -> T>,
}

impl<T> Item<T> {
    pub fn new(key: ItemKey, schema: u32) -> Self {
        Self {
            key,
            schema,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn schema(&self) -> u32 {
        self.schema
    }
}

impl<T> Clone for Item<T> {
    fn clone(&self) -> Self {
        Self::new(self.key.clone(), self.schema)
    }
}

impl<T> fmt::Debug for Item<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("key", &self.key)
            .field("schema", &self.schema)
            .finish()
    }
}

impl<T: DeserializeOwned> Item<T> {
    /// Decode a cached envelope into this item's type.
    pub(crate) fn decode(&self, envelope: Option<&Envelope>) -> Result<Option<T>> {
        let Some(envelope) = envelope else {
            return Ok(None);
        };
        if envelope.schema != self.schema {
            log::debug!(
                "Decoding {} written with schema {} as schema {}",
                self.key,
                envelope.schema,
                self.schema
            );
        }
        serde_json::from_value(envelope.value.clone())
            .map(Some)
            .map_err(|e| AppError::storage(self.key.as_str(), format!("cannot decode: {e}")))
    }
}

/// Live view of one item.
///
/// The first call to [`ItemWatch::next`] yields the current value; later
/// calls wait for the next commit and yield the value it left behind.
/// Several commits landing between two calls are seen as one.
pub struct ItemWatch<T> {
    item: Item<T>,
    rx: watch::Receiver<Option<Arc<Envelope>>>,
    started: bool,
}

impl<T: DeserializeOwned> ItemWatch<T> {
    pub(crate) fn new(item: Item<T>, rx: watch::Receiver<Option<Arc<Envelope>>>) -> Self {
        Self {
            item,
            rx,
            started: false,
        }
    }

    /// Current committed value without waiting.
    pub fn current(&self) -> Result<Option<T>> {
        self.item.decode(self.rx.borrow().as_deref())
    }

    /// Next observed value; `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Result<Option<T>>> {
        if self.started {
            self.rx.changed().await.ok()?;
        } else {
            self.started = true;
        }
        let envelope = self.rx.borrow_and_update().clone();
        Some(self.item.decode(envelope.as_deref()))
    }

    /// Consume the watch as a stream of observed values.
    pub fn into_stream(self) -> impl Stream<Item = Result<Option<T>>> {
        futures::stream::unfold(self, |mut watch| async move {
            let value = watch.next().await?;
            Some((value, watch))
        })
    }
}
