//! Caching infrastructure for per-request state and rate lookups
//!
//! This module provides the TTL-based in-memory stores used by the bot:
//! pending captcha challenges keyed by user id and short-lived exchange-rate
//! memoization. Abandoned captcha challenges expire with their TTL.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Generic cache entry with expiration time
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When this entry expires
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Check if this entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total number of entries
    pub entries: usize,
    /// Number of hits
    pub hits: u64,
    /// Number of misses
    pub misses: u64,
}

/// Thread-safe in-memory TTL cache
pub struct MemoryCache<K, V> {
    data: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    stats: Arc<RwLock<CacheStats>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Create a new memory cache
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    /// Get a value, skipping expired entries
    pub fn get(&self, key: &K) -> Option<V> {
        let data = self.data.read();
        let mut stats = self.stats.write();

        match data.get(key) {
            Some(entry) if !entry.is_expired() => {
                stats.hits += 1;
                Some(entry.value.clone())
            }
            _ => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Insert a value with a time to live
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        self.data.write().insert(key, CacheEntry::new(value, ttl));
    }

    /// Remove a value, returning it if present and fresh
    pub fn remove(&self, key: &K) -> Option<V> {
        self.data
            .write()
            .remove(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value)
    }

    /// Drop all expired entries
    pub fn cleanup(&self) {
        let mut data = self.data.write();
        let initial_len = data.len();

        data.retain(|_, entry| !entry.is_expired());

        let removed = initial_len - data.len();
        if removed > 0 {
            tracing::debug!("Cache cleanup removed {} expired entries", removed);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().clone();
        stats.entries = self.data.read().len();
        stats
    }

    /// Get cache size
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for MemoryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            stats: Arc::clone(&self.stats),
        }
    }
}

/// A captcha challenge waiting for the user's answer
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCaptcha {
    /// The word shown in the challenge text
    pub word: String,
    /// The emoji the user must pick
    pub expected: String,
}

/// How long an unanswered captcha stays valid
pub const CAPTCHA_TTL: Duration = Duration::from_secs(5 * 60);

/// How long a fetched exchange rate is reused before re-querying the provider
pub const RATE_TTL: Duration = Duration::from_secs(60);

/// Shared caches handed to every handler
#[derive(Clone, Default)]
pub struct BotCaches {
    /// Pending captcha challenge per Telegram user id
    pub captcha: MemoryCache<i64, PendingCaptcha>,
    /// Exchange rates per asset pair, e.g. "TON/USD"
    pub rates: MemoryCache<String, f64>,
}

impl BotCaches {
    /// Create the cache set with empty stores
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_memory_cache_basic_operations() {
        let cache = MemoryCache::new();

        cache.insert("key1", "value1", Duration::from_secs(60));
        assert_eq!(cache.get(&"key1"), Some("value1"));
        assert_eq!(cache.get(&"key2"), None);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_memory_cache_expiration() {
        let cache = MemoryCache::new();

        cache.insert("key1", "value1", Duration::from_millis(10));
        assert_eq!(cache.get(&"key1"), Some("value1"));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"key1"), None);
    }

    #[test]
    fn test_memory_cache_cleanup() {
        let cache = MemoryCache::new();

        cache.insert("key1", "value1", Duration::from_millis(10));
        cache.insert("key2", "value2", Duration::from_secs(60));

        thread::sleep(Duration::from_millis(20));
        cache.cleanup();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"key2"), Some("value2"));
    }

    #[test]
    fn test_remove_skips_expired_entries() {
        let cache = MemoryCache::new();

        cache.insert(1i64, "fresh", Duration::from_secs(60));
        cache.insert(2i64, "stale", Duration::from_millis(5));
        thread::sleep(Duration::from_millis(15));

        assert_eq!(cache.remove(&1), Some("fresh"));
        assert_eq!(cache.remove(&2), None);
    }

    #[test]
    fn test_pending_captcha_store() {
        let caches = BotCaches::new();
        let challenge = PendingCaptcha {
            word: "apple".to_string(),
            expected: "🍎".to_string(),
        };

        caches.captcha.insert(42, challenge.clone(), CAPTCHA_TTL);
        assert_eq!(caches.captcha.get(&42), Some(challenge));
        assert_eq!(caches.captcha.remove(&42).map(|c| c.word), Some("apple".to_string()));
        assert!(caches.captcha.is_empty());
    }
}
