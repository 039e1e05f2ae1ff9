use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Per-metric false-positive accounting. The core only emits counters;
/// persistence of `metric_validations`/`metric_stats` rows is an external
/// concern.
#[derive(Debug, Default)]
struct MetricCounters {
    total_uses: AtomicU64,
    false_positives: AtomicU64,
    true_positives: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricStats {
    pub total_uses: u64,
    pub false_positives: u64,
    pub true_positives: u64,
    pub fp_rate: f64,
    pub is_enabled: bool,
}

/// Append-only FP-rate event stream plus a read-through roll-up, so the
/// disable rule is a single read of the derived `is_enabled` flag. Modeled
/// on `codegraph-graph`'s `dashmap`-backed concurrent counters.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    counters: DashMap<&'static str, MetricCounters>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_use(&self, metric_name: &'static str) {
        self.counters
            .entry(metric_name)
            .or_default()
            .total_uses
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feedback(&self, metric_name: &'static str, true_positive: bool) {
        let entry = self.counters.entry(metric_name).or_default();
        if true_positive {
            entry.true_positives.fetch_add(1, Ordering::Relaxed);
        } else {
            entry.false_positives.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self, metric_name: &'static str) -> MetricStats {
        let Some(entry) = self.counters.get(metric_name) else {
            return MetricStats {
                total_uses: 0,
                false_positives: 0,
                true_positives: 0,
                fp_rate: 0.0,
                is_enabled: true,
            };
        };
        let total_uses = entry.total_uses.load(Ordering::Relaxed);
        let false_positives = entry.false_positives.load(Ordering::Relaxed);
        let true_positives = entry.true_positives.load(Ordering::Relaxed);
        let fp_rate = if total_uses > 0 {
            false_positives as f64 / total_uses as f64
        } else {
            0.0
        };
        MetricStats {
            total_uses,
            false_positives,
            true_positives,
            fp_rate,
            // Disabled once fp_rate > 3% over >= 100 uses.
            is_enabled: !(fp_rate > 0.03 && total_uses >= 100),
        }
    }

    /// Returns `false` if this metric should be withheld from the emitted
    /// `Phase1Result`.
    pub fn is_enabled(&self, metric_name: &'static str) -> bool {
        self.stats(metric_name).is_enabled
    }
}

/// Per-phase duration accounting, attached to traces/logs rather than
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDurations {
    #[serde(with = "duration_millis")]
    pub phase0: Duration,
    #[serde(with = "duration_millis")]
    pub phase1: Duration,
    #[serde(with = "duration_millis")]
    pub phase2: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_disabled_once_fp_rate_exceeds_threshold_with_enough_uses() {
        let registry = MetricRegistry::new();
        for _ in 0..96 {
            registry.record_use("cochange");
            registry.record_feedback("cochange", true);
        }
        for _ in 0..4 {
            registry.record_use("cochange");
            registry.record_feedback("cochange", false);
        }
        let stats = registry.stats("cochange");
        assert_eq!(stats.total_uses, 100);
        assert!(stats.fp_rate > 0.03);
        assert!(!stats.is_enabled);
    }

    #[test]
    fn metric_stays_enabled_below_the_use_floor_even_with_high_fp_rate() {
        let registry = MetricRegistry::new();
        for _ in 0..10 {
            registry.record_use("coupling");
            registry.record_feedback("coupling", false);
        }
        assert!(registry.is_enabled("coupling"));
    }
}
