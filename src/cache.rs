//! Time-bounded value cache
//!
//! Keeps the last successfully fetched value per key together with the
//! instant it was stored. There is no background sweeper and no capacity
//! bound: the keyspace is the set of symbols an application asks for.
//!
//! Expiry is judged at read time against either the cache default or a
//! per-read TTL. `get` never deletes; stale entries are replaced by the next
//! `set` or removed by `invalidate`/`prune_expired`/`clear`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Cached value with insertion time
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// TTL cache keyed by string
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    /// Default TTL when a read does not supply one
    default_ttl: Duration,
    /// Disabled caches miss on every read
    enabled: bool,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with a default TTL in whole seconds
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_secs),
            enabled: true,
        }
    }

    /// Create a cache that never returns hits
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(0)
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get a value if it was stored less than `ttl` ago
    ///
    /// `None` for `ttl` uses the cache default. A zero TTL always misses.
    pub fn get(&self, key: &str, ttl: Option<Duration>) -> Option<V> {
        if !self.enabled {
            return None;
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return None;
        }

        let entries = self.entries.read();
        let entry = entries.get(key)?;
        let now = Instant::now();

        if entry.is_fresh(now, ttl) {
            tracing::trace!(
                key = key,
                age_ms = now.saturating_duration_since(entry.inserted_at).as_millis() as u64,
                "Cache hit"
            );
            Some(entry.value.clone())
        } else {
            tracing::trace!(key = key, "Cache entry stale");
            None
        }
    }

    /// Store a value, replacing whatever was there
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        tracing::trace!(key = %key, "Cache insert");
        self.entries.write().insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove a single entry
    pub fn invalidate(&self, key: &str) {
        if self.entries.write().remove(key).is_some() {
            tracing::trace!(key = key, "Cache invalidate");
        }
    }

    /// Remove every entry
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        tracing::debug!(removed, "Cache cleared");
    }

    /// Drop entries older than the default TTL
    pub fn prune_expired(&self) {
        let now = Instant::now();
        let ttl = self.default_ttl;
        self.entries
            .write()
            .retain(|_, entry| entry.is_fresh(now, ttl));
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Entry counts judged against the default TTL
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let now = Instant::now();
        let valid_entries = entries
            .values()
            .filter(|entry| entry.is_fresh(now, self.default_ttl))
            .count();

        CacheStats {
            entries: entries.len(),
            valid_entries,
            stale_entries: entries.len() - valid_entries,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Total entries held
    pub entries: usize,
    /// Entries younger than the default TTL
    pub valid_entries: usize,
    /// Entries at or past the default TTL
    pub stale_entries: usize,
}
