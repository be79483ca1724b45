//! Read-through cache for filter value listings.
//!
//! `ValueCacheStore` is the storage port; `LruValueStore` is the in-process
//! implementation. `ValueCache` layers the read-through policy on top: a zero
//! TTL bypasses the store, and store failures degrade to computing the value.

use crate::clock::{expiry, Clock};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const VALUES_KEY_PREFIX: &str = "filters:values:";

/// Cache key of one page of values of a filter.
pub fn value_cache_key(filter_id: &str, page: usize, per_page: usize) -> String {
    format!("{}{}:{}:{}", VALUES_KEY_PREFIX, filter_id, page, per_page)
}

/// Prefix shared by every cached page of a filter.
pub fn value_cache_prefix(filter_id: &str) -> String {
    format!("{}{}:", VALUES_KEY_PREFIX, filter_id)
}

/// Key-value storage with per-entry TTL.
#[async_trait]
pub trait ValueCacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>>;

    async fn set(&self, key: &str, value: JsonValue, ttl: Duration) -> Result<()>;

    /// Remove every key starting with `prefix`; returns how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}

struct Entry {
    value: JsonValue,
    expires_at: DateTime<Utc>,
}

/// Bounded in-memory store. Least recently used entries are evicted first;
/// expired entries are dropped when read.
pub struct LruValueStore {
    entries: Mutex<LruCache<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl LruValueStore {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Cache("value store lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LruValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruValueStore")
            .field("len", &self.len())
            .finish()
    }
}

#[async_trait]
impl ValueCacheStore for LruValueStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: JsonValue, ttl: Duration) -> Result<()> {
        let expires_at = expiry(self.clock.now(), ttl);
        self.lock()?
            .put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut entries = self.lock()?;
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "lru"
    }
}

/// Read-through policy over a `ValueCacheStore`.
#[derive(Clone)]
pub struct ValueCache {
    store: Arc<dyn ValueCacheStore>,
}

impl ValueCache {
    pub fn new(store: Arc<dyn ValueCacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ValueCacheStore> {
        &self.store
    }

    /// Cached value under `key`, or the result of `compute` stored for `ttl`.
    ///
    /// A zero `ttl` always computes. Errors from `compute` are returned and
    /// never cached.
    pub async fn remember<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if ttl.is_zero() {
            return compute().await;
        }

        match self.store.get(key).await {
            Ok(Some(hit)) => match serde_json::from_value(hit) {
                Ok(value) => {
                    tracing::debug!(key, backend = self.store.backend_name(), "Value cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key, error = %e, "Value cache read failed");
            }
        }

        let value = compute().await?;
        match serde_json::to_value(&value) {
            Ok(encoded) => {
                if let Err(e) = self.store.set(key, encoded, ttl).await {
                    tracing::warn!(key, error = %e, "Value cache write failed");
                }
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Value not cacheable");
            }
        }
        Ok(value)
    }

    pub async fn invalidate_prefix(&self, prefix: &str) -> Result<u64> {
        let removed = self.store.delete_prefix(prefix).await?;
        tracing::debug!(prefix, removed, "Value cache invalidated");
        Ok(removed)
    }
}

impl std::fmt::Debug for ValueCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCache")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}
