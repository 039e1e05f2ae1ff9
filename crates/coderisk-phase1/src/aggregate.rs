use crate::{cochange, coupling, incidents, ownership, test_ratio};
use coderisk_core::{MetricRegistry, Phase1Config, Phase1Result, RiskLevel};
use coderisk_store::HybridQueries;
use std::time::Duration;

const COCHANGE_THRESHOLD: f64 = 0.0;
const RECENT_NEIGHBOUR_LIMIT: u32 = 100;

/// Runs every Phase 1 metric concurrently against the hybrid query layer and
/// folds the results into a single `Phase1Result`. A resolved-path set of
/// zero paths (a brand-new file with no KG history) short-circuits to
/// `Phase1Result::empty()` without issuing any query.
pub async fn run(
    queries: &HybridQueries,
    registry: &MetricRegistry,
    paths: &[String],
    config: &Phase1Config,
    per_query_deadline: Duration,
) -> Phase1Result {
    if paths.is_empty() {
        return Phase1Result::empty();
    }

    let (coupling, cochange, test_ratio, ownership, incidents) = tokio::join!(
        coupling::fetch(queries, registry, paths, config.coupling_limit, per_query_deadline),
        cochange::fetch(
            queries,
            registry,
            paths,
            COCHANGE_THRESHOLD,
            config.cochange_window_days,
            per_query_deadline,
        ),
        test_ratio::fetch(queries, registry, paths, RECENT_NEIGHBOUR_LIMIT, per_query_deadline),
        ownership::fetch(queries, registry, paths, per_query_deadline),
        incidents::fetch(
            queries,
            registry,
            paths,
            config.incident_window_days,
            per_query_deadline,
        ),
    );

    fold(coupling, cochange, test_ratio, ownership, incidents)
}

/// Pure combinator over already-fetched metric results, separated from
/// `run` so the aggregation arithmetic is unit-testable without a live
/// store.
pub fn fold(
    coupling: Option<coderisk_core::MetricResult<coderisk_core::CouplingMetric>>,
    cochange: Option<coderisk_core::MetricResult<coderisk_core::CoChangeMetric>>,
    test_ratio: Option<coderisk_core::MetricResult<coderisk_core::TestRatioMetric>>,
    ownership: Option<coderisk_core::MetricResult<coderisk_core::OwnershipMetric>>,
    incidents: Option<coderisk_core::MetricResult<coderisk_core::IncidentMetric>>,
) -> Phase1Result {
    let risks = [
        coupling.as_ref().map(|m| m.risk),
        cochange.as_ref().map(|m| m.risk),
        test_ratio.as_ref().map(|m| m.risk),
        ownership.as_ref().map(|m| m.risk),
        incidents.as_ref().map(|m| m.risk),
    ];
    let risk = risks
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(RiskLevel::Low);

    let any_high = risks.into_iter().flatten().any(|r| r == RiskLevel::High);
    let incidents_non_empty = incidents
        .as_ref()
        .map(|m| super::incidents::forces_escalation(&m.value))
        .unwrap_or(false);

    Phase1Result {
        coupling,
        cochange,
        test_ratio,
        ownership,
        incidents,
        risk,
        should_escalate: any_high || incidents_non_empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderisk_core::{CoChangeMetric, CouplingMetric, IncidentMetric, MetricResult, OwnershipMetric, TestRatioMetric};

    fn result<T>(value: T, risk: RiskLevel) -> Option<MetricResult<T>> {
        Some(MetricResult {
            value,
            risk,
            enabled: true,
        })
    }

    #[test]
    fn overall_risk_is_max_of_present_metrics() {
        let out = fold(
            result(CouplingMetric { incoming: 1, outgoing: 1 }, RiskLevel::Low),
            result(CoChangeMetric { partners: vec![] }, RiskLevel::Medium),
            None,
            None,
            None,
        );
        assert_eq!(out.risk, RiskLevel::Medium);
        assert!(!out.should_escalate);
    }

    #[test]
    fn any_high_metric_forces_escalation() {
        let out = fold(
            result(CouplingMetric { incoming: 20, outgoing: 20 }, RiskLevel::High),
            None,
            None,
            None,
            None,
        );
        assert!(out.should_escalate);
    }

    #[test]
    fn nonempty_incidents_force_escalation_even_if_other_metrics_are_low() {
        let incident = coderisk_core::Incident {
            issue_number: 1,
            pr_number: None,
            commit_sha: "abc".to_string(),
            link_type: "fixed_by".to_string(),
            confidence: 0.9,
            detection_method: "label".to_string(),
            evidence: Vec::new(),
            issue_title: "t".to_string(),
            issue_body: None,
            labels: Vec::new(),
            created_at: chrono::Utc::now(),
            closed_at: None,
            author_login: "dev".to_string(),
            author_role: None,
        };
        let out = fold(
            result(CouplingMetric { incoming: 0, outgoing: 0 }, RiskLevel::Low),
            None,
            None,
            None,
            result(IncidentMetric { incidents: vec![incident] }, RiskLevel::High),
        );
        assert!(out.should_escalate);
        assert_eq!(out.risk, RiskLevel::High);
    }

    #[test]
    fn all_metrics_absent_defaults_to_low_no_escalation() {
        let out: Phase1Result = fold(None, None, None, None, None);
        assert_eq!(out.risk, RiskLevel::Low);
        assert!(!out.should_escalate);
    }

    #[test]
    fn missing_ownership_and_test_ratio_does_not_prevent_aggregation() {
        let out = fold(
            None,
            None,
            result(TestRatioMetric { tests_touching: 0, direct_users: 2, ratio: 0.05 }, RiskLevel::High),
            None::<MetricResult<OwnershipMetric>>,
            None,
        );
        assert_eq!(out.risk, RiskLevel::High);
        assert!(out.should_escalate);
    }
}
