// agentflow-rcr/src/load.rs
// ============================================================================
// Module: Advisory Load Tracking
// Description: In-memory per-role load counters, optionally mirrored to a
//              KV store with a short TTL so other processes converge.
// Purpose: Feed the `resource` scoring dimension and selection's capacity
//          check with a load figure that is cheap and good enough, not
//          strictly consistent.
// Dependencies: agentflow-core, tokio
// ============================================================================

//! ## Overview
//! Load counters are advisory: a dropped KV write or a stale read only
//! biases routing slightly, it never blocks a decision. The in-memory map is
//! authoritative for this process; the KV mirror exists purely so sibling
//! processes eventually see roughly the same picture.

use std::collections::BTreeMap;
use std::sync::Arc;

use agentflow_core::RoleName;
use agentflow_core::interfaces::KvStore;
use agentflow_core::ids::CacheKey;
use tokio::sync::RwLock;

/// TTL applied to the KV-mirrored load counter, per the load-tracking rule.
const LOAD_TTL_MS: u64 = 5 * 60 * 1000;

/// Tracks advisory per-role load, in-process and optionally in a `KvStore`.
pub struct LoadTracker {
    /// Authoritative in-process counters, keyed by role name.
    counters: RwLock<BTreeMap<String, u32>>,
    /// Optional KV mirror for cross-process convergence.
    kv: Option<Arc<dyn KvStore>>,
}

impl LoadTracker {
    /// Builds a tracker with no KV mirror.
    #[must_use]
    pub fn new() -> Self {
        Self { counters: RwLock::new(BTreeMap::new()), kv: None }
    }

    /// Builds a tracker that also mirrors counters into `kv`.
    #[must_use]
    pub fn with_kv(kv: Arc<dyn KvStore>) -> Self {
        Self { counters: RwLock::new(BTreeMap::new()), kv: Some(kv) }
    }

    /// Returns a snapshot of every tracked role's current load.
    pub async fn snapshot(&self) -> BTreeMap<String, u32> {
        self.counters.read().await.clone()
    }

    /// Increments `role`'s load counter and mirrors the new value to KV,
    /// ignoring (but logging) a mirror failure.
    pub async fn increment(&self, role: &RoleName) {
        let new_value = {
            let mut counters = self.counters.write().await;
            let entry = counters.entry(role.as_str().to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };
        self.mirror(role, new_value).await;
    }

    /// Decrements `role`'s load counter (e.g. on step completion) and
    /// mirrors the new value to KV.
    pub async fn decrement(&self, role: &RoleName) {
        let new_value = {
            let mut counters = self.counters.write().await;
            let entry = counters.entry(role.as_str().to_string()).or_insert(0);
            *entry = entry.saturating_sub(1);
            *entry
        };
        self.mirror(role, new_value).await;
    }

    /// Best-effort write of `role`'s current load to the KV mirror.
    async fn mirror(&self, role: &RoleName, value: u32) {
        let Some(kv) = &self.kv else {
            return;
        };
        let key = CacheKey::new(format!("rcr:load:{role}"));
        let payload = value.to_le_bytes().to_vec();
        if let Err(error) = kv.set(&key, payload, Some(LOAD_TTL_MS)).await {
            tracing::warn!(role = %role, %error, "failed to mirror role load to kv store");
        }
    }
}

impl Default for LoadTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[tokio::test]
    async fn increment_and_decrement_move_the_counter() {
        let tracker = LoadTracker::new();
        let role = RoleName::new("analyst");
        tracker.increment(&role).await;
        tracker.increment(&role).await;
        assert_eq!(tracker.snapshot().await.get("analyst"), Some(&2));
        tracker.decrement(&role).await;
        assert_eq!(tracker.snapshot().await.get("analyst"), Some(&1));
    }

    #[tokio::test]
    async fn decrement_below_zero_saturates() {
        let tracker = LoadTracker::new();
        let role = RoleName::new("analyst");
        tracker.decrement(&role).await;
        assert_eq!(tracker.snapshot().await.get("analyst"), Some(&0));
    }
}
