use coderisk_core::{Incident, IncidentMetric, MetricRegistry, RiskLevel};
use coderisk_store::HybridQueries;
use std::time::Duration;
use tracing::warn;

pub const METRIC_NAME: &str = "incidents";

/// Any linked incident forces escalation regardless of the other metrics;
/// one or more incidents bands HIGH, none bands LOW.
pub fn band(metric: &IncidentMetric) -> RiskLevel {
    if metric.incidents.is_empty() {
        RiskLevel::Low
    } else {
        RiskLevel::High
    }
}

pub fn forces_escalation(metric: &IncidentMetric) -> bool {
    !metric.incidents.is_empty()
}

pub async fn fetch(
    queries: &HybridQueries,
    registry: &MetricRegistry,
    paths: &[String],
    days_back: u32,
    deadline: Duration,
) -> Option<coderisk_core::MetricResult<IncidentMetric>> {
    if !registry.is_enabled(METRIC_NAME) {
        return None;
    }
    registry.record_use(METRIC_NAME);
    match queries.get_incident_history_for(paths, days_back, deadline).await {
        Ok(incidents) => {
            let metric = IncidentMetric { incidents };
            let risk = band(&metric);
            Some(coderisk_core::MetricResult {
                value: metric,
                risk,
                enabled: true,
            })
        }
        Err(e) => {
            warn!(error = %e, "incident history query failed, omitting metric");
            None
        }
    }
}

fn incident(issue_number: u64) -> Incident {
    Incident {
        issue_number,
        pr_number: None,
        commit_sha: "deadbeef".to_string(),
        link_type: "fixed_by".to_string(),
        confidence: 0.9,
        detection_method: "label".to_string(),
        evidence: Vec::new(),
        issue_title: "title".to_string(),
        issue_body: None,
        labels: Vec::new(),
        created_at: chrono::Utc::now(),
        closed_at: None,
        author_login: "dev".to_string(),
        author_role: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_incidents_bands_low_and_does_not_escalate() {
        let metric = IncidentMetric { incidents: vec![] };
        assert_eq!(band(&metric), RiskLevel::Low);
        assert!(!forces_escalation(&metric));
    }

    #[test]
    fn any_incident_bands_high_and_forces_escalation() {
        let metric = IncidentMetric {
            incidents: vec![incident(42)],
        };
        assert_eq!(band(&metric), RiskLevel::High);
        assert!(forces_escalation(&metric));
    }
}
