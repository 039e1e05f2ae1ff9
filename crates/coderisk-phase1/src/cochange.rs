use coderisk_core::{CoChangeMetric, CoChangePartner, MetricRegistry, RiskLevel};
use coderisk_store::HybridQueries;
use std::time::Duration;
use tracing::warn;

pub const METRIC_NAME: &str = "cochange";

/// `max_freq >= 0.7` HIGH, `>= 0.5` MEDIUM, else LOW.
pub fn band(metric: &CoChangeMetric) -> RiskLevel {
    let max_freq = metric.max_frequency();
    if max_freq >= 0.7 {
        RiskLevel::High
    } else if max_freq >= 0.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub async fn fetch(
    queries: &HybridQueries,
    registry: &MetricRegistry,
    paths: &[String],
    threshold: f64,
    window_days: u32,
    deadline: Duration,
) -> Option<coderisk_core::MetricResult<CoChangeMetric>> {
    if !registry.is_enabled(METRIC_NAME) {
        return None;
    }
    registry.record_use(METRIC_NAME);
    match queries
        .get_cochange_partners_with_context(paths, threshold, window_days, deadline)
        .await
    {
        Ok(partners) => {
            let metric = CoChangeMetric { partners };
            let risk = band(&metric);
            Some(coderisk_core::MetricResult {
                value: metric,
                risk,
                enabled: true,
            })
        }
        Err(e) => {
            warn!(error = %e, "co-change query failed, omitting metric");
            None
        }
    }
}

fn partner(path: &str, frequency: f64) -> CoChangePartner {
    CoChangePartner {
        partner_path: path.to_string(),
        frequency,
        co_changes: 0,
        example_messages: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_band_at_or_above_seventy_percent() {
        let metric = CoChangeMetric {
            partners: vec![partner("a", 0.7)],
        };
        assert_eq!(band(&metric), RiskLevel::High);
    }

    #[test]
    fn medium_band_at_or_above_fifty_percent() {
        let metric = CoChangeMetric {
            partners: vec![partner("a", 0.5), partner("b", 0.82)].into_iter().take(1).collect(),
        };
        assert_eq!(band(&metric), RiskLevel::Medium);
    }

    #[test]
    fn low_band_below_fifty_percent() {
        let metric = CoChangeMetric {
            partners: vec![partner("a", 0.1)],
        };
        assert_eq!(band(&metric), RiskLevel::Low);
    }

    #[test]
    fn empty_partner_list_bands_low() {
        let metric = CoChangeMetric { partners: vec![] };
        assert_eq!(band(&metric), RiskLevel::Low);
    }

    #[test]
    fn band_uses_max_frequency_across_partners() {
        let metric = CoChangeMetric {
            partners: vec![partner("a", 0.2), partner("b", 0.82), partner("c", 0.4)],
        };
        assert_eq!(band(&metric), RiskLevel::High);
    }
}
