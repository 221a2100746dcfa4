// agentflow-pipeline/src/metrics.rs
// ============================================================================
// Module: Stability Metrics
// Description: Tracks per-run success/failure samples and computes the
//              population variance used as this run's stability indicator.
// Purpose: Resolve the spec's undefined `variance_score` (Open Question) as
//          the population variance of the last N 0/1 success samples.
// Dependencies: std
// ============================================================================

//! ## Overview
//! `variance_score` is undefined by the spec beyond its name. This module
//! defines it as the population variance of a rolling window of 0/1 success
//! flags, one per completed run: a run that always succeeds or always fails
//! has a variance of 0, a run that flips every other time approaches 0.25.

use std::collections::VecDeque;
use std::sync::Mutex;

/// How many recent run outcomes are retained for the variance calculation.
const WINDOW_SIZE: usize = 50;

/// Rolling window of recent run outcomes (`true` = success).
pub struct StabilityTracker {
    /// Interior-mutable ring buffer of recent outcomes.
    samples: Mutex<VecDeque<bool>>,
}

impl StabilityTracker {
    /// Builds an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self { samples: Mutex::new(VecDeque::with_capacity(WINDOW_SIZE)) }
    }

    /// Records one run outcome, evicting the oldest sample once the window
    /// is full.
    #[allow(clippy::unwrap_used, reason = "mutex is never poisoned: no panics occur while held")]
    pub fn record(&self, succeeded: bool) {
        let mut samples = self.samples.lock().unwrap();
        if samples.len() == WINDOW_SIZE {
            samples.pop_front();
        }
        samples.push_back(succeeded);
    }

    /// Returns the population variance of the current window's 0/1 success
    /// flags, or `0.0` if no samples have been recorded yet.
    #[allow(clippy::unwrap_used, reason = "mutex is never poisoned: no panics occur while held")]
    #[must_use]
    pub fn variance_score(&self) -> f64 {
        let samples = self.samples.lock().unwrap();
        variance_of(&samples)
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Population variance of a sequence of booleans treated as 0.0/1.0.
fn variance_of(samples: &VecDeque<bool>) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss, reason = "sample counts stay far below f64's exact-integer range")]
    let n = samples.len() as f64;
    let values: Vec<f64> = samples.iter().map(|&success| if success { 1.0 } else { 0.0 }).collect();
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_successes_have_zero_variance() {
        let tracker = StabilityTracker::new();
        for _ in 0..5 {
            tracker.record(true);
        }
        assert!((tracker.variance_score() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn alternating_outcomes_approach_quarter_variance() {
        let tracker = StabilityTracker::new();
        for i in 0..10 {
            tracker.record(i % 2 == 0);
        }
        assert!((tracker.variance_score() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn window_evicts_the_oldest_sample() {
        let tracker = StabilityTracker::new();
        for _ in 0..WINDOW_SIZE {
            tracker.record(true);
        }
        tracker.record(false);
        assert!(tracker.variance_score() > 0.0);
    }
}
