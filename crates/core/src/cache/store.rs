//! Shared-future request cache.
//!
//! Entries hold the future of a provider call rather than its value, so a
//! caller arriving while a request is still in flight joins that request
//! instead of issuing a new one.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde_json::Value;

use super::keys::{CacheKey, InvalidationScope};
use crate::error::Result;

/// A cloneable handle on a pending or resolved operation result.
pub type SharedResult<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Content of a cache entry, tagged like its key.
#[derive(Clone)]
pub enum CacheEntry {
    Single(SharedResult<Value>),
    Multiple(SharedResult<Vec<Value>>),
}

/// Values that can be stored in a [`CacheEntry`].
pub trait Cacheable: Clone + Send + Sync + Sized + 'static {
    fn into_entry(shared: SharedResult<Self>) -> CacheEntry;
    fn from_entry(entry: &CacheEntry) -> Option<SharedResult<Self>>;
}

impl Cacheable for Value {
    fn into_entry(shared: SharedResult<Self>) -> CacheEntry {
        CacheEntry::Single(shared)
    }

    fn from_entry(entry: &CacheEntry) -> Option<SharedResult<Self>> {
        match entry {
            CacheEntry::Single(shared) => Some(shared.clone()),
            CacheEntry::Multiple(_) => None,
        }
    }
}

impl Cacheable for Vec<Value> {
    fn into_entry(shared: SharedResult<Self>) -> CacheEntry {
        CacheEntry::Multiple(shared)
    }

    fn from_entry(entry: &CacheEntry) -> Option<SharedResult<Self>> {
        match entry {
            CacheEntry::Multiple(shared) => Some(shared.clone()),
            CacheEntry::Single(_) => None,
        }
    }
}

struct Slot {
    generation: u64,
    entry: CacheEntry,
}

#[derive(Default)]
struct CacheInner {
    entries: DashMap<CacheKey, Slot>,
    generation: AtomicU64,
}

/// Request cache shared by every repository of a group.
///
/// Cloning the handle shares the underlying map. Entries never expire; they
/// are removed by [`Cache::invalidate`], [`Cache::clear`], or when the
/// operation they hold fails.
#[derive(Clone, Default)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

impl Cache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `key`, or starts the operation built by `make`
    /// and stores it before returning.
    ///
    /// The lookup and the insertion happen under the map's entry lock, so at
    /// most one operation per key is ever in flight. `make` must only build
    /// the future; it is polled later by whoever awaits the result.
    pub fn get_or_insert_with<T, F, Fut>(&self, key: CacheKey, make: F) -> SharedResult<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        match self.inner.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if let Some(shared) = T::from_entry(&occupied.get().entry) {
                    tracing::trace!(key = %occupied.key(), "Cache hit");
                    return shared;
                }
                // Same key, other tag: the stored entry cannot serve this call.
                tracing::warn!(key = %occupied.key(), "Cache entry tag mismatch, replacing");
                let generation = self.next_generation();
                let shared = self.track(occupied.key().clone(), generation, make());
                occupied.insert(Slot {
                    generation,
                    entry: T::into_entry(shared.clone()),
                });
                shared
            }
            Entry::Vacant(vacant) => {
                tracing::trace!(key = %vacant.key(), "Cache miss");
                let generation = self.next_generation();
                let shared = self.track(vacant.key().clone(), generation, make());
                vacant.insert(Slot {
                    generation,
                    entry: T::into_entry(shared.clone()),
                });
                shared
            }
        }
    }

    /// Removes the entries of `entity` covered by `scope` (all of them when
    /// `scope` is `None`). Returns the number of entries removed.
    pub fn invalidate(&self, entity: &str, scope: Option<&InvalidationScope>) -> usize {
        let before = self.inner.entries.len();
        self.inner
            .entries
            .retain(|key, _| !key.is_covered_by(entity, scope));
        let removed = before.saturating_sub(self.inner.entries.len());
        tracing::debug!(entity, removed, "Cache invalidated");
        removed
    }

    /// Removes one entry.
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.inner.entries.remove(key).is_some()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Keys of every stored entry, in no particular order.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.inner
            .entries
            .iter()
            .map(|slot| slot.key().clone())
            .collect()
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Wraps `fut` so a failed result evicts its own entry once resolved.
    ///
    /// Callers that already joined the future still observe the failure; the
    /// next caller starts a fresh request. The generation check keeps a late
    /// failure from evicting a newer entry stored under the same key.
    fn track<T, Fut>(&self, key: CacheKey, generation: u64, fut: Fut) -> SharedResult<T>
    where
        T: Cacheable,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let inner = Arc::downgrade(&self.inner);
        async move {
            let result = fut.await;
            if let Err(err) = &result {
                if let Some(inner) = inner.upgrade() {
                    inner
                        .entries
                        .remove_if(&key, |_, slot| slot.generation == generation);
                }
                tracing::debug!(key = %key, error = %err, "Evicted failed cache entry");
            }
            result
        }
        .boxed()
        .shared()
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.inner.entries.len())
            .finish()
    }
}
