use std::sync::Arc;
use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::cache::kv::KeyValueStore;
use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_CACHE_PREFIX;
use crate::error::Result;

/// Persisted record: `{ "data": .., "timestamp": ms, "expiresAt": ms }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
    pub expires_at: i64,
}

impl<T> CacheEntry<T> {
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        now_millis < self.expires_at
    }
}

/// Namespaced TTL cache over a shared [`KeyValueStore`].
///
/// Reads never fail: missing, expired and unreadable entries all come back as
/// `None`, and the last two are deleted on the spot. Writes never fail
/// either; a write the medium refuses is retried once after purging expired
/// entries and then dropped.
pub struct CacheStore {
    backend: Arc<dyn KeyValueStore>,
    prefix: String,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            default_ttl: Duration::from_secs(30 * 60),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);
        let raw = match self.backend.get(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", full_key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry {}: {}", full_key, e);
                self.remove_full(&full_key);
                return None;
            }
        };

        if !entry.is_valid_at(self.clock.now_millis()) {
            tracing::debug!("Cache entry expired: {}", full_key);
            self.remove_full(&full_key);
            return None;
        }

        Some(entry.data)
    }

    /// Stores `value` for `ttl`, or the store's default TTL when `None`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let full_key = self.full_key(key);
        let ttl_millis = i64::try_from(ttl.unwrap_or(self.default_ttl).as_millis())
            .unwrap_or(i64::MAX);
        let timestamp = self.clock.now_millis();

        let entry = CacheEntry {
            data: value,
            timestamp,
            expires_at: timestamp.saturating_add(ttl_millis),
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Not caching {}: payload does not serialize: {}", full_key, e);
                return;
            }
        };

        if let Err(e) = self.backend.set(&full_key, &payload) {
            tracing::warn!(
                "Cache write failed for {} ({}), purging expired entries and retrying",
                full_key,
                if e.is_quota() { "medium full" } else { "backend error" }
            );
            self.clean_expired();

            if let Err(e) = self.backend.set(&full_key, &payload) {
                tracing::warn!("Dropping cache write for {}: {}", full_key, e);
                return;
            }
        }

        tracing::debug!("Cached {} for {}ms", full_key, ttl_millis);
    }

    pub fn remove(&self, key: &str) {
        self.remove_full(&self.full_key(key));
    }

    fn remove_full(&self, full_key: &str) {
        if let Err(e) = self.backend.remove(full_key) {
            tracing::warn!("Cache delete failed for {}: {}", full_key, e);
        }
    }

    /// Removes one entry, or every entry under this store's prefix when
    /// `key` is `None`. Keys outside the prefix are never touched.
    pub fn clear(&self, key: Option<&str>) {
        if let Some(key) = key {
            self.remove(key);
            return;
        }

        match self.namespaced_keys() {
            Ok(keys) => {
                tracing::debug!("Clearing {} cache entries", keys.len());
                for full_key in keys {
                    self.remove_full(&full_key);
                }
            }
            Err(e) => tracing::warn!("Cache clear failed: {}", e),
        }
    }

    /// Full scan of the namespace; returns how many entries were removed.
    pub fn clean_expired(&self) -> usize {
        let keys = match self.namespaced_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Cache scan failed: {}", e);
                return 0;
            }
        };

        let now = self.clock.now_millis();
        let mut removed = 0;

        for full_key in keys {
            let stale = match self.backend.get(&full_key) {
                Ok(Some(raw)) => serde_json::from_str::<CacheEntry<IgnoredAny>>(&raw)
                    .map(|entry| !entry.is_valid_at(now))
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!("Cache read failed for {}: {}", full_key, e);
                    false
                }
            };

            if stale {
                self.remove_full(&full_key);
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!("Removed {} expired cache entries", removed);
        }
        removed
    }

    pub fn has(&self, key: &str) -> bool {
        self.get::<IgnoredAny>(key).is_some()
    }

    /// Remaining lifetime; zero when the entry is missing, unreadable or
    /// already expired.
    pub fn time_to_live(&self, key: &str) -> Duration {
        let raw = match self.backend.get(&self.full_key(key)) {
            Ok(Some(raw)) => raw,
            _ => return Duration::ZERO,
        };

        serde_json::from_str::<CacheEntry<IgnoredAny>>(&raw)
            .ok()
            .map(|entry| entry.expires_at.saturating_sub(self.clock.now_millis()))
            .filter(|left| *left > 0)
            .map(|left| Duration::from_millis(left as u64))
            .unwrap_or(Duration::ZERO)
    }

    fn namespaced_keys(&self) -> Result<Vec<String>> {
        self.backend.keys_with_prefix(&self.prefix)
    }
}
