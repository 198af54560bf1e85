//! # Detection Cache
//!
//! Short-TTL memo of classifier results, bounding recomputation under burst
//! load. Keyed by token, access-count bucket, and TTL-sized time bucket.
//!
//! INVARIANT-4: an entry is never served past its TTL, even if the periodic
//! sweep is late; age is re-checked on every read.

use parking_lot::RwLock;
use shared_types::{IndicatorHit, TimestampMicros, TokenId};
use std::collections::HashMap;

/// Cache key: one memo per token per access-count decade per TTL bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Token the round was about.
    pub token_id: TokenId,
    /// `access_count / count_bucket` at round time.
    pub count_bucket: u64,
    /// `timestamp / ttl` at round time.
    pub time_bucket: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    hits: Vec<IndicatorHit>,
    inserted_at: TimestampMicros,
}

/// TTL-bounded memo of classifier rounds.
#[derive(Debug)]
pub struct DetectionCache {
    ttl_micros: u64,
    count_bucket: u64,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl DetectionCache {
    /// Create a cache with the given TTL and access-count bucket width.
    pub fn new(ttl_micros: u64, count_bucket: u64) -> Self {
        Self {
            ttl_micros,
            count_bucket: count_bucket.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Build the key for a round.
    pub fn key(&self, token_id: TokenId, access_count: u64, now: TimestampMicros) -> CacheKey {
        CacheKey {
            token_id,
            count_bucket: access_count / self.count_bucket,
            time_bucket: now / self.ttl_micros.max(1),
        }
    }

    /// Memoized hits for `key`, if present and still fresh.
    pub fn get(&self, key: &CacheKey, now: TimestampMicros) -> Option<Vec<IndicatorHit>> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if now.saturating_sub(entry.inserted_at) >= self.ttl_micros {
            return None;
        }
        Some(entry.hits.clone())
    }

    /// Memoize a round's hits.
    pub fn insert(&self, key: CacheKey, hits: Vec<IndicatorHit>, now: TimestampMicros) {
        self.entries
            .write()
            .insert(key, CacheEntry { hits, inserted_at: now });
    }

    /// Drop expired entries. Called by the periodic cleanup pass.
    pub fn sweep(&self, now: TimestampMicros) {
        self.entries
            .write()
            .retain(|_, entry| now.saturating_sub(entry.inserted_at) < self.ttl_micros);
    }

    /// Entries currently held (fresh or awaiting sweep).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Indicator;

    fn hits() -> Vec<IndicatorHit> {
        vec![IndicatorHit {
            indicator: Indicator::Speedup,
            confidence: 0.8,
        }]
    }

    #[test]
    fn hit_within_ttl_bucket_is_identical() {
        let cache = DetectionCache::new(5_000_000, 10);
        let token = TokenId::random();
        let key = cache.key(token, 12, 1_000_000);
        cache.insert(key, hits(), 1_000_000);

        // Same decade, same TTL bucket: identical memo.
        let again = cache.key(token, 15, 1_200_000);
        assert_eq!(key, again);
        assert_eq!(cache.get(&again, 1_200_000), Some(hits()));
    }

    #[test]
    fn entry_never_served_past_ttl() {
        let cache = DetectionCache::new(5_000_000, 10);
        let token = TokenId::random();
        let key = cache.key(token, 0, 0);
        cache.insert(key, hits(), 0);
        assert!(cache.get(&key, 4_999_999).is_some());
        assert!(cache.get(&key, 5_000_000).is_none());
    }

    #[test]
    fn count_bucket_separates_bursts() {
        let cache = DetectionCache::new(5_000_000, 10);
        let token = TokenId::random();
        assert_ne!(cache.key(token, 9, 0), cache.key(token, 10, 0));
    }

    #[test]
    fn sweep_drops_expired_entries_only() {
        let cache = DetectionCache::new(5_000_000, 10);
        let token = TokenId::random();
        cache.insert(cache.key(token, 0, 0), hits(), 0);
        cache.insert(cache.key(token, 0, 8_000_000), hits(), 8_000_000);
        cache.sweep(8_000_000);
        assert_eq!(cache.len(), 1);
    }
}
