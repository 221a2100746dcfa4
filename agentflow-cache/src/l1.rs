// agentflow-cache/src/l1.rs
// ============================================================================
// Module: L1 In-Process Cache
// Description: Sharded, lock-protected LRU+TTL cache tier.
// Purpose: Serve the hottest reads without a remote round trip while
//          bounding both item count and byte footprint.
// Dependencies: agentflow-core, tokio::sync
// ============================================================================

//! ## Overview
//! L1 is sharded so concurrent workers rarely contend on the same lock: a
//! key's shard is chosen by a cheap hash of the key, and each shard enforces
//! its own slice of the item and byte budgets. This trades a perfectly
//! global LRU for one that evicts within a shard, which is the standard
//! shared-nothing tradeoff for a cache this hot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use agentflow_core::CacheEntry;
use agentflow_core::CacheKey;
use agentflow_core::Timestamp;
use tokio::sync::RwLock;

/// Number of shards the L1 cache divides its key space into.
const SHARD_COUNT: usize = 16;

// ============================================================================
// SECTION: Shard
// ============================================================================

/// A single L1 shard: an LRU+TTL map bounded by item count and byte size.
struct Shard {
    /// Entries held by this shard.
    entries: HashMap<CacheKey, CacheEntry>,
    /// Sum of `CacheEntry::size` across all entries in this shard.
    bytes: usize,
}

impl Shard {
    /// Creates an empty shard.
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            bytes: 0,
        }
    }

    /// Evicts least-recently-accessed entries until both budgets hold.
    fn evict_to_budget(&mut self, max_items: usize, max_bytes: usize) {
        while self.entries.len() > max_items || self.bytes > max_bytes {
            let Some(oldest_key) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.accessed_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            if let Some(removed) = self.entries.remove(&oldest_key) {
                self.bytes = self.bytes.saturating_sub(removed.size);
            }
        }
    }
}

// ============================================================================
// SECTION: L1Cache
// ============================================================================

/// Sharded in-process LRU+TTL cache.
pub struct L1Cache {
    /// Per-shard state, each independently locked.
    shards: Vec<RwLock<Shard>>,
    /// Maximum entries per shard.
    max_items_per_shard: usize,
    /// Maximum bytes per shard.
    max_bytes_per_shard: usize,
}

impl L1Cache {
    /// Creates an L1 cache with the given total item and megabyte budgets,
    /// divided evenly across [`SHARD_COUNT`] shards.
    #[must_use]
    pub fn new(max_items: usize, max_mb: usize) -> Self {
        let shards = (0..SHARD_COUNT).map(|_| RwLock::new(Shard::new())).collect();
        Self {
            shards,
            max_items_per_shard: (max_items / SHARD_COUNT).max(1),
            max_bytes_per_shard: (max_mb * 1024 * 1024 / SHARD_COUNT).max(1),
        }
    }

    /// Returns the shard index for `key`.
    fn shard_index(key: &CacheKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % SHARD_COUNT
    }

    /// Reads `key`, returning `None` on a miss or an expired entry.
    ///
    /// On a hit, updates `accessed_at` and `access_count` for LRU ordering.
    pub async fn get(&self, key: &CacheKey, now: Timestamp) -> Option<CacheEntry> {
        let index = Self::shard_index(key);
        let mut shard = self.shards[index].write().await;
        let expired = shard.entries.get(key).is_some_and(|entry| entry.is_expired(now));
        if expired {
            if let Some(removed) = shard.entries.remove(key) {
                shard.bytes = shard.bytes.saturating_sub(removed.size);
            }
            return None;
        }
        let entry = shard.entries.get_mut(key)?;
        entry.accessed_at = now;
        entry.access_count += 1;
        Some(entry.clone())
    }

    /// Inserts or replaces `entry`, evicting LRU entries in its shard as
    /// needed to stay within budget.
    pub async fn put(&self, entry: CacheEntry) {
        let index = Self::shard_index(&entry.key);
        let mut shard = self.shards[index].write().await;
        if let Some(previous) = shard.entries.remove(&entry.key) {
            shard.bytes = shard.bytes.saturating_sub(previous.size);
        }
        shard.bytes += entry.size;
        shard.entries.insert(entry.key.clone(), entry);
        shard.evict_to_budget(self.max_items_per_shard, self.max_bytes_per_shard);
    }

    /// Removes `key`, if present. Idempotent.
    pub async fn delete(&self, key: &CacheKey) {
        let index = Self::shard_index(key);
        let mut shard = self.shards[index].write().await;
        if let Some(removed) = shard.entries.remove(key) {
            shard.bytes = shard.bytes.saturating_sub(removed.size);
        }
    }

    /// Returns the total number of live (possibly stale) entries across all
    /// shards. Used only for tests and diagnostics.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.read().await.entries.len();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    fn entry(key: &str, size: usize, accessed_at: i64) -> CacheEntry {
        CacheEntry {
            key: CacheKey::new(key),
            value: serde_json::json!({"v": key}),
            created_at: Timestamp::from_millis(0),
            accessed_at: Timestamp::from_millis(accessed_at),
            expires_at: Timestamp::from_millis(1_000_000),
            size,
            access_count: 0,
            dependencies: Vec::new(),
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_value_within_ttl() {
        let cache = L1Cache::new(100, 16);
        cache.put(entry("k1", 10, 1)).await;
        let got = cache.get(&CacheKey::new("k1"), Timestamp::from_millis(2)).await;
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = L1Cache::new(100, 16);
        cache.put(entry("k1", 10, 1)).await;
        let got = cache.get(&CacheKey::new("k1"), Timestamp::from_millis(2_000_000)).await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = L1Cache::new(100, 16);
        cache.delete(&CacheKey::new("missing")).await;
        cache.put(entry("k1", 10, 1)).await;
        cache.delete(&CacheKey::new("k1")).await;
        cache.delete(&CacheKey::new("k1")).await;
        assert_eq!(cache.len().await, 0);
    }
}
