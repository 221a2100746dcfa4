// agentflow-webhook/src/health.rs
// ============================================================================
// Module: Endpoint Health
// Description: Rolling 24h dispatch/dead-letter window and the auto-disable
//              decision it feeds.
// Purpose: Decide when a misbehaving endpoint should stop receiving
//          deliveries.
// Dependencies: agentflow-core, tokio
// ============================================================================

//! ## Overview
//! Each dispatch to an endpoint records one event (dead-lettered or not)
//! with its timestamp. `evaluate` prunes events older than the window, then
//! checks both conditions from the routing contract: at least
//! `min_dead_letters` dead letters, and a dead-letter ratio above
//! `ratio_threshold`.

use std::collections::BTreeMap;
use std::time::Duration;

use agentflow_core::Timestamp;
use agentflow_core::WebhookId;
use tokio::sync::RwLock;

/// Width of the rolling health-evaluation window.
const WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// One recorded dispatch outcome.
#[derive(Debug, Clone, Copy)]
struct Event {
    /// When the dispatch was recorded.
    at: Timestamp,
    /// Whether the dispatch was ultimately dead-lettered.
    dead_lettered: bool,
}

/// Per-endpoint rolling dispatch history.
#[derive(Default)]
struct History {
    /// Events within (or recently outside) the rolling window, oldest first.
    events: Vec<Event>,
}

/// Tracks rolling dispatch health per endpoint and decides auto-disable.
pub struct HealthTracker {
    /// Per-endpoint event history, guarded for concurrent dispatches.
    histories: RwLock<BTreeMap<WebhookId, History>>,
}

impl HealthTracker {
    /// Builds an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self { histories: RwLock::new(BTreeMap::new()) }
    }

    /// Records one dispatch outcome for `webhook_id` and returns whether the
    /// endpoint should now be auto-disabled under `min_dead_letters` and
    /// `ratio_threshold`.
    pub async fn record(&self, webhook_id: &WebhookId, at: Timestamp, dead_lettered: bool, min_dead_letters: u32, ratio_threshold: f64) -> bool {
        let mut histories = self.histories.write().await;
        let history = histories.entry(webhook_id.clone()).or_default();
        history.events.retain(|event| at.saturating_duration_since(event.at) < WINDOW);
        history.events.push(Event { at, dead_lettered });

        let dead_letters = history.events.iter().filter(|event| event.dead_lettered).count();
        let attempts = history.events.len();
        if attempts == 0 || dead_letters < min_dead_letters as usize {
            return false;
        }
        #[allow(clippy::cast_precision_loss, reason = "dispatch counts stay far below f64's exact-integer range")]
        let ratio = dead_letters as f64 / attempts as f64;
        ratio > ratio_threshold
    }
}

impl Default for HealthTracker {
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
    async fn stays_healthy_below_the_dead_letter_floor() {
        let tracker = HealthTracker::new();
        let webhook_id = WebhookId::new("wh-1");
        for i in 0..9 {
            let at = Timestamp::from_millis(i * 1_000);
            assert!(!tracker.record(&webhook_id, at, true, 10, 0.8).await);
        }
    }

    #[tokio::test]
    async fn disables_once_both_thresholds_clear() {
        let tracker = HealthTracker::new();
        let webhook_id = WebhookId::new("wh-1");
        for i in 0..10 {
            let at = Timestamp::from_millis(i * 1_000);
            let disable = tracker.record(&webhook_id, at, true, 10, 0.8).await;
            if i < 9 {
                assert!(!disable);
            } else {
                assert!(disable);
            }
        }
    }

    #[tokio::test]
    async fn high_attempt_volume_keeps_ratio_below_threshold_healthy() {
        let tracker = HealthTracker::new();
        let webhook_id = WebhookId::new("wh-1");
        for i in 0..20 {
            let at = Timestamp::from_millis(i * 1_000);
            tracker.record(&webhook_id, at, false, 10, 0.8).await;
        }
        let at = Timestamp::from_millis(20_000);
        for _ in 0..10 {
            assert!(!tracker.record(&webhook_id, at, true, 10, 0.8).await);
        }
    }
}
