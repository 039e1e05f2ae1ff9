use coderisk_core::{MetricRegistry, RiskLevel, TestRatioMetric};
use coderisk_store::HybridQueries;
use std::time::Duration;
use tracing::warn;

pub const METRIC_NAME: &str = "test_ratio";

/// `< 0.1` HIGH, `< 0.3` MEDIUM, else LOW. Low test coverage is high risk,
/// so the bands run in the opposite direction from coupling/co-change.
pub fn band(metric: &TestRatioMetric) -> RiskLevel {
    if metric.ratio < 0.1 {
        RiskLevel::High
    } else if metric.ratio < 0.3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub async fn fetch(
    queries: &HybridQueries,
    registry: &MetricRegistry,
    paths: &[String],
    limit: u32,
    deadline: Duration,
) -> Option<coderisk_core::MetricResult<TestRatioMetric>> {
    if !registry.is_enabled(METRIC_NAME) {
        return None;
    }
    registry.record_use(METRIC_NAME);
    match queries.get_test_ratio(paths, limit, deadline).await {
        Ok(metric) => {
            let risk = band(&metric);
            Some(coderisk_core::MetricResult {
                value: metric,
                risk,
                enabled: true,
            })
        }
        Err(e) => {
            warn!(error = %e, "test ratio query failed, omitting metric");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(ratio: f64) -> TestRatioMetric {
        TestRatioMetric {
            tests_touching: 0,
            direct_users: 0,
            ratio,
        }
    }

    #[test]
    fn high_band_below_point_one() {
        assert_eq!(band(&metric(0.05)), RiskLevel::High);
    }

    #[test]
    fn medium_band_below_point_three() {
        assert_eq!(band(&metric(0.2)), RiskLevel::Medium);
    }

    #[test]
    fn low_band_at_or_above_point_three() {
        assert_eq!(band(&metric(0.3)), RiskLevel::Low);
        assert_eq!(band(&metric(1.0)), RiskLevel::Low);
    }
}
