use coderisk_core::{CouplingMetric, MetricRegistry, RiskLevel};
use coderisk_store::HybridQueries;
use std::time::Duration;
use tracing::warn;

pub const METRIC_NAME: &str = "coupling";

/// `>15` incoming+outgoing neighbours HIGH, `>10` MEDIUM, else LOW.
pub fn band(metric: &CouplingMetric) -> RiskLevel {
    let total = metric.incoming + metric.outgoing;
    if total > 15 {
        RiskLevel::High
    } else if total > 10 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Fetches the structural-coupling metric and bands it. Returns `None` (not
/// an error) when the underlying store query fails or the metric has been
/// auto-disabled by the FP-rate gate — a missing metric is a normal Phase 1
/// outcome, not a pipeline failure.
pub async fn fetch(
    queries: &HybridQueries,
    registry: &MetricRegistry,
    paths: &[String],
    limit: u32,
    deadline: Duration,
) -> Option<coderisk_core::MetricResult<CouplingMetric>> {
    if !registry.is_enabled(METRIC_NAME) {
        return None;
    }
    registry.record_use(METRIC_NAME);
    match queries.get_structural_coupling(paths, limit, deadline).await {
        Ok(metric) => {
            let risk = band(&metric);
            Some(coderisk_core::MetricResult {
                value: metric,
                risk,
                enabled: true,
            })
        }
        Err(e) => {
            warn!(error = %e, "structural coupling query failed, omitting metric");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(incoming: u32, outgoing: u32) -> CouplingMetric {
        CouplingMetric { incoming, outgoing }
    }

    #[test]
    fn high_band_above_fifteen() {
        assert_eq!(band(&metric(10, 6)), RiskLevel::High);
    }

    #[test]
    fn medium_band_above_ten() {
        assert_eq!(band(&metric(6, 5)), RiskLevel::Medium);
    }

    #[test]
    fn low_band_at_or_below_ten() {
        assert_eq!(band(&metric(5, 5)), RiskLevel::Low);
        assert_eq!(band(&metric(0, 0)), RiskLevel::Low);
    }

    #[test]
    fn boundary_is_strictly_greater_than() {
        assert_eq!(band(&metric(15, 0)), RiskLevel::Medium);
        assert_eq!(band(&metric(16, 0)), RiskLevel::High);
        assert_eq!(band(&metric(11, 0)), RiskLevel::Medium);
    }
}
