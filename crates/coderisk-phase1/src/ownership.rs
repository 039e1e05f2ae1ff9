use coderisk_core::{CommitSummary, MetricRegistry, OwnerEntry, OwnershipMetric, RiskLevel};
use coderisk_store::HybridQueries;
use std::time::Duration;
use tracing::warn;

pub const METRIC_NAME: &str = "ownership";
const INACTIVE_THRESHOLD_DAYS: i64 = 90;
const BUS_FACTOR_THRESHOLD: f64 = 0.9;
/// Bound on the commit window replayed for transition dating — matches
/// `get_recent_commits`'s own clamp ceiling (spec.md §4.4's explicit-LIMIT
/// rule), so this baseline pass and the agent's `get_ownership_timeline`
/// tool see the same bounded history.
const TRANSITION_COMMIT_LIMIT: u32 = 50;

/// Flagged if the top owner is inactive for more than 90 days, or their
/// share of commits concentrates at or above 90%. Flagged ⇒ HIGH, else LOW.
pub fn band(metric: &OwnershipMetric) -> RiskLevel {
    if metric.top_owner_inactive || metric.bus_factor_concentration >= BUS_FACTOR_THRESHOLD {
        RiskLevel::High
    } else {
        RiskLevel::Low
    }
}

/// Folds the aggregate owner list and a bounded window of recent commits
/// into a single metric, including when the current top owner overtook
/// whoever led before (`coderisk_core::compute_transition`; see SPEC_FULL.md
/// §3's ownership-transition supplement).
pub fn summarize(owners: Vec<OwnerEntry>, recent_commits: &[CommitSummary]) -> OwnershipMetric {
    let top_owner_inactive = owners.first().map(|o| !o.is_active).unwrap_or(false);
    let total: u32 = owners.iter().map(|o| o.commit_count).sum();
    let bus_factor_concentration = owners
        .first()
        .map(|top| top.commit_count as f64 / total.max(1) as f64)
        .unwrap_or(0.0);
    let (transition_date, days_since_transition) =
        coderisk_core::compute_transition(&owners, recent_commits);

    OwnershipMetric {
        owners,
        top_owner_inactive,
        bus_factor_concentration,
        transition_date,
        days_since_transition,
    }
}

pub async fn fetch(
    queries: &HybridQueries,
    registry: &MetricRegistry,
    paths: &[String],
    deadline: Duration,
) -> Option<coderisk_core::MetricResult<OwnershipMetric>> {
    if !registry.is_enabled(METRIC_NAME) {
        return None;
    }
    registry.record_use(METRIC_NAME);

    let (owners_result, commits_result) = tokio::join!(
        queries.get_ownership_history_for(paths, deadline),
        queries.get_recent_commits(paths, TRANSITION_COMMIT_LIMIT, deadline),
    );

    match owners_result {
        Ok(owners) => {
            let commits = commits_result.unwrap_or_else(|e| {
                warn!(error = %e, "recent-commits query failed, omitting ownership transition");
                Vec::new()
            });
            let metric = summarize(owners, &commits);
            let risk = band(&metric);
            Some(coderisk_core::MetricResult {
                value: metric,
                risk,
                enabled: true,
            })
        }
        Err(e) => {
            warn!(error = %e, "ownership query failed, omitting metric");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn owner(email: &str, commits: u32, is_active: bool) -> OwnerEntry {
        OwnerEntry {
            email: email.to_string(),
            commit_count: commits,
            last_commit: Utc::now(),
            is_active,
            days_since_commit: if is_active { 1 } else { INACTIVE_THRESHOLD_DAYS + 1 },
            author_association: None,
        }
    }

    #[test]
    fn inactive_top_owner_flags_high() {
        let metric = summarize(vec![owner("a@x.com", 5, false), owner("b@x.com", 3, true)], &[]);
        assert!(metric.top_owner_inactive);
        assert_eq!(band(&metric), RiskLevel::High);
    }

    #[test]
    fn concentrated_bus_factor_flags_high_even_if_active() {
        let metric = summarize(vec![owner("a@x.com", 95, true), owner("b@x.com", 5, true)], &[]);
        assert!(metric.bus_factor_concentration >= 0.9);
        assert_eq!(band(&metric), RiskLevel::High);
    }

    #[test]
    fn distributed_active_ownership_bands_low() {
        let metric = summarize(vec![owner("a@x.com", 5, true), owner("b@x.com", 5, true)], &[]);
        assert!(!metric.top_owner_inactive);
        assert!(metric.bus_factor_concentration < 0.9);
        assert_eq!(band(&metric), RiskLevel::Low);
    }

    #[test]
    fn empty_owner_list_bands_low() {
        let metric = summarize(vec![], &[]);
        assert_eq!(band(&metric), RiskLevel::Low);
    }

    #[test]
    fn transition_is_populated_when_recent_commits_explain_the_current_top_owner() {
        let owners = vec![owner("b@x.com", 2, true), owner("a@x.com", 2, true)];
        let commits = vec![
            CommitSummary {
                sha: "1".to_string(),
                message: "m".to_string(),
                author_email: "a@x.com".to_string(),
                committed_at: Utc::now() - chrono::Duration::days(30),
            },
            CommitSummary {
                sha: "2".to_string(),
                message: "m".to_string(),
                author_email: "b@x.com".to_string(),
                committed_at: Utc::now() - chrono::Duration::days(20),
            },
            CommitSummary {
                sha: "3".to_string(),
                message: "m".to_string(),
                author_email: "b@x.com".to_string(),
                committed_at: Utc::now() - chrono::Duration::days(10),
            },
        ];
        let metric = summarize(owners, &commits);
        assert!(metric.transition_date.is_some());
        assert!(metric.days_since_transition.is_some());
    }
}
