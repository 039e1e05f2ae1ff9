use crate::{doc, environment, modification, security};
use coderisk_core::{ModificationType, Phase0Result, RiskLevel};

/// Runs every sub-detector and folds the result into the gate decision:
/// doc-only short-circuits, any force-escalating detector skips Phase 1,
/// otherwise the modification-type labels are combined arithmetically.
pub fn classify(path: &str, content_or_diff: &str) -> Phase0Result {
    if path.is_empty() {
        return Phase0Result::unknown();
    }

    if doc::is_doc_only(path) || doc::is_comment_only_diff(content_or_diff) {
        return Phase0Result::doc_only();
    }

    let security = security::classify(path, content_or_diff);
    let environment = environment::classify(path);

    if security.force_escalate {
        return Phase0Result {
            skip_all: false,
            force_escalate: true,
            risk: security.risk,
            primary_label: Some(ModificationType::Security),
            labels: vec![ModificationType::Security],
            reasons: security_reasons(&security),
        };
    }
    if environment.force_escalate {
        return Phase0Result {
            skip_all: false,
            force_escalate: true,
            risk: environment.risk,
            primary_label: Some(ModificationType::Configuration),
            labels: vec![ModificationType::Configuration],
            reasons: environment_reasons(&environment),
        };
    }

    let mut labels = modification::classify(path, content_or_diff);
    if security.risk == RiskLevel::High {
        labels.push(ModificationType::Security);
    }
    if environment.is_config_file {
        labels.push(ModificationType::Configuration);
    }
    labels.dedup();

    let risk = aggregate_risk(&labels);
    let primary_label = modification::primary_label(&labels);

    Phase0Result {
        skip_all: false,
        force_escalate: false,
        risk,
        primary_label,
        labels,
        reasons: vec!["aggregated from modification-type labels".to_string()],
    }
}

/// `max(scores) + 0.3 * sum(other scores)`, re-bucketed back into a level.
fn aggregate_risk(labels: &[ModificationType]) -> RiskLevel {
    if labels.is_empty() {
        return RiskLevel::Minimal;
    }
    let scores: Vec<u8> = labels.iter().map(|l| l.base_risk().as_score()).collect();
    let max = *scores.iter().max().unwrap_or(&1) as f64;
    let sum_others: u32 = scores.iter().map(|s| *s as u32).sum::<u32>() - max as u32;
    RiskLevel::from_score(max + 0.3 * sum_others as f64)
}

fn security_reasons(finding: &security::SecurityFinding) -> Vec<String> {
    let mut reasons = Vec::new();
    if finding.path_matched {
        reasons.push("security-sensitive path pattern".to_string());
    }
    if !finding.matched_keywords.is_empty() {
        reasons.push(format!(
            "security keywords: {}",
            finding.matched_keywords.join(", ")
        ));
    }
    reasons
}

fn environment_reasons(finding: &environment::EnvironmentFinding) -> Vec<String> {
    match finding.environment {
        Some(env) => vec![format!("configuration file in {env:?} environment")],
        None => vec!["configuration file".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_only_short_circuits() {
        let result = classify("README.md", "+ some new text");
        assert!(result.skip_all);
        assert_eq!(result.risk, RiskLevel::Low);
    }

    #[test]
    fn security_force_escalate_bypasses_aggregation() {
        let result = classify("internal/auth/login.go", "validate jwt token");
        assert!(!result.skip_all);
        assert!(result.force_escalate);
        assert_eq!(result.risk, RiskLevel::Critical);
    }

    #[test]
    fn production_config_force_escalates() {
        let result = classify(".env.production", "DATABASE_URL=postgres://prod");
        assert!(result.force_escalate);
        assert_eq!(result.risk, RiskLevel::Critical);
    }

    #[test]
    fn plain_source_change_aggregates_from_labels() {
        let result = classify("src/routes.rs", "router.get(\"/users\", handler)");
        assert!(!result.force_escalate);
        assert!(!result.skip_all);
        assert_eq!(result.risk, RiskLevel::High);
    }

    #[test]
    fn empty_input_is_unknown_and_recommends_phase1() {
        let result = classify("", "");
        assert_eq!(result.risk, RiskLevel::Minimal);
        assert!(!result.skip_all);
        assert!(!result.force_escalate);
    }
}
