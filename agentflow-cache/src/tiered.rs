// agentflow-cache/src/tiered.rs
// ============================================================================
// Module: Tiered Cache
// Description: L1/L2/L3 cache orchestration with propagate-on-hit and
//              dependency-aware invalidation.
// Purpose: Give the pipeline one `get`/`put`/`invalidate` surface over three
//          tiers of differing cost and durability.
// Dependencies: agentflow-core, tokio, tracing
// ============================================================================

//! ## Overview
//! `Get` probes tiers in the strategy's order; a hit in a lower tier is
//! propagated up to every higher tier the strategy includes, using that
//! tier's own TTL. `Put` writes every included tier. `Invalidate` deletes
//! the key everywhere this process controls and cascades one level through
//! the dependency graph.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use agentflow_core::CacheEntry;
use agentflow_core::CacheKey;
use agentflow_core::Timestamp;
use agentflow_core::interfaces::KvStore;
use tokio::sync::Mutex;
use tracing::debug;

use crate::depgraph::DependencyGraph;
use crate::errors::CacheError;
use crate::l1::L1Cache;
use crate::strategy::CacheStrategy;
use crate::strategy::CacheTier;

// ============================================================================
// SECTION: TieredCache
// ============================================================================

/// The three-tier result cache.
pub struct TieredCache {
    /// In-process tier.
    l1: L1Cache,
    /// Remote KV tier, when configured.
    l2: Option<Arc<dyn KvStore>>,
    /// Durable tier, when configured.
    l3: Option<Arc<dyn KvStore>>,
    /// Base time-to-live applied before a strategy's multiplier, in seconds.
    base_ttl_s: u64,
    /// Dependency graph used for cascade invalidation.
    depgraph: Mutex<DependencyGraph>,
}

impl TieredCache {
    /// Creates a tiered cache. `l2`/`l3` may be omitted when a process runs
    /// with only an in-memory tier (e.g. tests or a single-node deployment).
    #[must_use]
    pub fn new(
        l1_max_items: usize,
        l1_max_mb: usize,
        l2: Option<Arc<dyn KvStore>>,
        l3: Option<Arc<dyn KvStore>>,
        base_ttl_s: u64,
    ) -> Self {
        Self {
            l1: L1Cache::new(l1_max_items, l1_max_mb),
            l2,
            l3,
            base_ttl_s,
            depgraph: Mutex::new(DependencyGraph::new()),
        }
    }

    /// Reads `key` following `strategy`'s tier order, propagating a lower-tier
    /// hit up to every higher tier the strategy includes.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] only when a configured remote/durable tier
    /// fails; callers should treat that as a miss rather than fail the run.
    pub async fn get(
        &self,
        key: &CacheKey,
        strategy: &CacheStrategy,
        now: Timestamp,
    ) -> Result<Option<serde_json::Value>, CacheError> {
        if strategy.includes(CacheTier::L1)
            && let Some(entry) = self.l1.get(key, now).await
        {
            return Ok(Some(entry.value));
        }
        if strategy.includes(CacheTier::L2)
            && let Some(kv) = &self.l2
            && let Some(entry) = self.read_kv_tier(kv.as_ref(), key, now).await?
        {
            if strategy.includes(CacheTier::L1) {
                self.l1.put(entry.clone()).await;
            }
            return Ok(Some(entry.value));
        }
        if strategy.includes(CacheTier::L3)
            && let Some(kv) = &self.l3
            && let Some(entry) = self.read_kv_tier(kv.as_ref(), key, now).await?
        {
            if strategy.includes(CacheTier::L1) {
                self.l1.put(entry.clone()).await;
            }
            if strategy.includes(CacheTier::L2)
                && let Some(kv) = &self.l2
            {
                self.write_kv_tier(kv.as_ref(), &entry, strategy.ttl_multiplier).await?;
            }
            return Ok(Some(entry.value));
        }
        Ok(None)
    }

    /// Writes `value` at `key` to every tier `strategy` includes, recording
    /// `dependencies` in the invalidation graph.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when a configured remote/durable tier fails.
    pub async fn put(
        &self,
        key: &CacheKey,
        value: serde_json::Value,
        dependencies: Vec<CacheKey>,
        strategy: &CacheStrategy,
        now: Timestamp,
    ) -> Result<(), CacheError> {
        let size = serde_json::to_vec(&value).map(|bytes| bytes.len()).unwrap_or(0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "ttl seconds fit comfortably in u64")]
        let ttl_s = (self.base_ttl_s as f64 * strategy.ttl_multiplier).round() as u64;
        let entry = CacheEntry {
            key: key.clone(),
            value,
            created_at: now,
            accessed_at: now,
            expires_at: Timestamp::from_millis(now.as_millis() + i64::try_from(ttl_s).unwrap_or(i64::MAX) * 1_000),
            size,
            access_count: 0,
            dependencies: dependencies.clone(),
        };
        if strategy.includes(CacheTier::L1) {
            self.l1.put(entry.clone()).await;
        }
        if strategy.includes(CacheTier::L2)
            && let Some(kv) = &self.l2
        {
            self.write_kv_tier(kv.as_ref(), &entry, strategy.ttl_multiplier).await?;
        }
        if strategy.includes(CacheTier::L3)
            && let Some(kv) = &self.l3
        {
            self.write_kv_tier(kv.as_ref(), &entry, strategy.ttl_multiplier).await?;
        }
        self.depgraph.lock().await.record(key, &dependencies);
        Ok(())
    }

    /// Deletes `key` from every tier this process controls. When `cascade`
    /// is true, every key recorded as depending on `key` is also
    /// invalidated, non-cascading, to stop after one level.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when a configured remote/durable tier fails.
    pub async fn invalidate(&self, key: &CacheKey, cascade: bool) -> Result<(), CacheError> {
        self.l1.delete(key).await;
        if let Some(kv) = &self.l2 {
            kv.delete(key).await?;
        }
        if let Some(kv) = &self.l3 {
            kv.delete(key).await?;
        }
        let dependents = {
            let mut graph = self.depgraph.lock().await;
            let dependents = graph.dependents_of(key);
            graph.remove(key);
            dependents
        };
        if cascade {
            debug!(key = key.as_str(), dependents = dependents.len(), "cascading cache invalidation");
            for dependent in dependents {
                Box::pin(self.invalidate(&dependent, false)).await?;
            }
        }
        Ok(())
    }

    /// Reads and deserializes a `CacheEntry` from a KV-backed tier,
    /// returning `None` on a miss or an expired entry.
    async fn read_kv_tier(
        &self,
        kv: &dyn KvStore,
        key: &CacheKey,
        now: Timestamp,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let Some(bytes) = kv.get(key).await? else {
            return Ok(None);
        };
        let entry: CacheEntry =
            serde_json::from_slice(&bytes).map_err(|err| CacheError::Serialization(err.to_string()))?;
        if entry.is_expired(now) {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Serializes and writes a `CacheEntry` to a KV-backed tier with a TTL
    /// derived from the remaining time until `expires_at`.
    async fn write_kv_tier(&self, kv: &dyn KvStore, entry: &CacheEntry, ttl_multiplier: f64) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(entry).map_err(|err| CacheError::Serialization(err.to_string()))?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "ttl milliseconds fit comfortably in u64")]
        let ttl_ms = (self.base_ttl_s as f64 * ttl_multiplier * 1000.0).round() as u64;
        kv.set(&entry.key, bytes, Some(ttl_ms)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[tokio::test]
    async fn round_trip_within_ttl() {
        let cache = TieredCache::new(100, 16, None, None, 300);
        let key = CacheKey::new("k1");
        let strategy = CacheStrategy::plan();
        cache.put(&key, serde_json::json!({"v": 1}), Vec::new(), &strategy, Timestamp::from_millis(0)).await.unwrap();
        let got = cache.get(&key, &strategy, Timestamp::from_millis(1_000)).await.unwrap();
        assert_eq!(got, Some(serde_json::json!({"v": 1})));
    }

    #[tokio::test]
    async fn invalidate_removes_key_and_its_dependents() {
        let cache = TieredCache::new(100, 16, None, None, 300);
        let strategy = CacheStrategy::plan();
        let base = CacheKey::new("base");
        let derived = CacheKey::new("derived");
        cache.put(&base, serde_json::json!(1), Vec::new(), &strategy, Timestamp::from_millis(0)).await.unwrap();
        cache
            .put(&derived, serde_json::json!(2), vec![base.clone()], &strategy, Timestamp::from_millis(0))
            .await
            .unwrap();
        cache.invalidate(&base, true).await.unwrap();
        assert_eq!(cache.get(&base, &strategy, Timestamp::from_millis(1)).await.unwrap(), None);
        assert_eq!(cache.get(&derived, &strategy, Timestamp::from_millis(1)).await.unwrap(), None);
    }
}
