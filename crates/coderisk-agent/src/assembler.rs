use crate::state::{EmergencyReason, FinishArgs, Outcome};
use coderisk_core::{
    EvidenceCategory, EvidenceItem, InvestigationTrace, ModificationType, Phase0Result,
    Phase1Result, RiskAssessment, RiskLevel,
};
use std::time::Duration;

/// Whether a caller wants blocking semantics or only an advisory report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Enforced,
    Advisory,
}

/// Assembles the final `RiskAssessment` from Phase 0, Phase 1, and the
/// agent's trace. `outcome` is `None` when Phase 2 never ran (Phase 0
/// short-circuited or the caller skipped the agent).
pub fn assemble(
    file_path: &str,
    phase0: &Phase0Result,
    phase1: &Phase1Result,
    trace: InvestigationTrace,
    outcome: Option<&Outcome>,
    duration: Duration,
    block_mode: BlockMode,
) -> RiskAssessment {
    let (risk_level, confidence, summary) = match outcome {
        Some(Outcome::Finished(args)) => {
            let calibrated = calibrate_confidence(args.confidence, hops_used(&trace));
            let level = if phase0.force_escalate {
                args.risk_level.max(phase0.risk)
            } else {
                args.risk_level
            };
            (level, calibrated, args.reasoning.clone())
        }
        Some(Outcome::Emergency(reason)) => (
            crate::prompt::emergency_risk_level(phase0, phase1),
            0.0,
            format!("Investigation ended early: {}.", reason.summary()),
        ),
        None => {
            let level = if phase0.skip_all {
                phase0.risk
            } else {
                phase1.risk
            };
            (level, 1.0, default_summary(phase0, phase1))
        }
    };

    let reasoning_text = match outcome {
        Some(Outcome::Finished(args)) => args.reasoning.as_str(),
        _ => summary.as_str(),
    };

    let mut evidence = phase0_evidence(phase0);
    evidence.extend(phase1_evidence(phase1));
    evidence.extend(cited_tool_evidence(&trace, reasoning_text));

    let recommendations = match outcome {
        Some(Outcome::Finished(args)) => dedup_and_order(&args.recommendations),
        _ => Vec::new(),
    };

    let should_block = block_mode == BlockMode::Enforced
        && matches!(risk_level, RiskLevel::High | RiskLevel::Critical);

    RiskAssessment {
        file_path: file_path.to_string(),
        risk_level,
        confidence,
        evidence,
        recommendations,
        summary,
        trace,
        duration,
        should_block,
    }
}

fn hops_used(trace: &InvestigationTrace) -> u32 {
    trace.hops.len() as u32
}

/// The assembler multiplies the declared confidence by
/// `1 - 0.1 * max(0, 5 - hops_used)` when `hops_used < 3`, clamped to
/// `[0, 1]` — a penalty for a conclusion reached with little investigation.
fn calibrate_confidence(declared: f64, hops_used: u32) -> f64 {
    let calibrated = if hops_used < 3 {
        let shortfall = 5_i64.saturating_sub(hops_used as i64).max(0) as f64;
        declared * (1.0 - 0.1 * shortfall)
    } else {
        declared
    };
    calibrated.clamp(0.0, 1.0)
}

fn default_summary(phase0: &Phase0Result, phase1: &Phase1Result) -> String {
    if phase0.skip_all {
        "Phase 0 short-circuited the file; no baseline metrics or investigation were run."
            .to_string()
    } else {
        format!(
            "No investigation was run; risk level reflects Phase 1 baseline metrics ({}).",
            phase1.risk
        )
    }
}

fn modification_category(m: ModificationType) -> EvidenceCategory {
    match m {
        ModificationType::Security => EvidenceCategory::Security,
        ModificationType::Interface => EvidenceCategory::Interface,
        ModificationType::Structural => EvidenceCategory::Structural,
        ModificationType::Configuration => EvidenceCategory::Configuration,
        ModificationType::Behavioral => EvidenceCategory::Behavioral,
        ModificationType::Performance => EvidenceCategory::Behavioral,
        ModificationType::TemporalPattern => EvidenceCategory::Behavioral,
        ModificationType::Ownership => EvidenceCategory::Ownership,
        ModificationType::TestQuality => EvidenceCategory::Test,
        ModificationType::Documentation => EvidenceCategory::Documentation,
    }
}

fn phase0_evidence(phase0: &Phase0Result) -> Vec<EvidenceItem> {
    let category = phase0
        .primary_label
        .map(modification_category)
        .unwrap_or(EvidenceCategory::Behavioral);
    phase0
        .reasons
        .iter()
        .map(|reason| EvidenceItem {
            category,
            description: reason.clone(),
            source: "phase0".to_string(),
        })
        .collect()
}

fn phase1_evidence(phase1: &Phase1Result) -> Vec<EvidenceItem> {
    let mut out = Vec::new();
    if let Some(m) = &phase1.coupling {
        out.push(EvidenceItem {
            category: EvidenceCategory::Structural,
            description: format!(
                "{} incoming and {} outgoing dependency edges at one hop.",
                m.value.incoming, m.value.outgoing
            ),
            source: "phase1:coupling".to_string(),
        });
    }
    if let Some(m) = &phase1.cochange {
        if !m.value.partners.is_empty() {
            out.push(EvidenceItem {
                category: EvidenceCategory::CoChange,
                description: format!(
                    "Co-changes with {} file(s), strongest frequency {:.0}%.",
                    m.value.partners.len(),
                    m.value.max_frequency() * 100.0
                ),
                source: "phase1:cochange".to_string(),
            });
        }
    }
    if let Some(m) = &phase1.test_ratio {
        out.push(EvidenceItem {
            category: EvidenceCategory::Test,
            description: format!(
                "Only {} of {} direct users are tests (ratio {:.2}).",
                m.value.tests_touching, m.value.direct_users, m.value.ratio
            ),
            source: "phase1:test_ratio".to_string(),
        });
    }
    if let Some(m) = &phase1.ownership {
        if m.value.top_owner_inactive || m.value.bus_factor_concentration >= 0.9 {
            out.push(EvidenceItem {
                category: EvidenceCategory::Ownership,
                description: format!(
                    "Top owner inactive: {}; bus-factor concentration {:.2}.",
                    m.value.top_owner_inactive, m.value.bus_factor_concentration
                ),
                source: "phase1:ownership".to_string(),
            });
        }
    }
    if let Some(m) = &phase1.incidents {
        if !m.value.incidents.is_empty() {
            out.push(EvidenceItem {
                category: EvidenceCategory::Incident,
                description: format!(
                    "{} linked incident(s) in the lookback window.",
                    m.value.incidents.len()
                ),
                source: "phase1:incidents".to_string(),
            });
        }
    }
    out
}

/// A tool result is cited when the agent's final reasoning quotes a
/// substring of it — matched against every quoted span in `reasoning`.
fn cited_tool_evidence(trace: &InvestigationTrace, reasoning: &str) -> Vec<EvidenceItem> {
    let quoted = quoted_spans(reasoning);
    if quoted.is_empty() {
        return Vec::new();
    }
    trace
        .hops
        .iter()
        .flat_map(|hop| hop.tool_calls.iter())
        .filter_map(|call| {
            let rendered = match &call.result {
                coderisk_core::ToolCallOutcome::Ok { result } => result.to_string(),
                coderisk_core::ToolCallOutcome::Error { .. } => return None,
            };
            let cited = quoted.iter().any(|span| rendered.contains(span.as_str()));
            cited.then(|| EvidenceItem {
                category: EvidenceCategory::Behavioral,
                description: format!("Cited result of `{}`.", call.name),
                source: format!("tool:{}", call.name),
            })
        })
        .collect()
}

fn quoted_spans(text: &str) -> Vec<String> {
    let mut spans = Vec::new();
    for (start, c) in text.char_indices() {
        if c == '"' {
            if let Some(end) = text[start + 1..].find('"') {
                let span = &text[start + 1..start + 1 + end];
                if !span.is_empty() {
                    spans.push(span.to_string());
                }
            }
        }
    }
    spans
}

fn categorize_recommendation(text: &str) -> EvidenceCategory {
    let lower = text.to_lowercase();
    const SECURITY: &[&str] = &["security", "auth", "token", "secret", "credential", "permission"];
    const INTERFACE: &[&str] = &["api", "interface", "signature", "contract", "endpoint"];
    const STRUCTURAL: &[&str] = &["coupling", "dependency", "dependents", "architecture"];
    const CONFIGURATION: &[&str] = &["config", "environment variable", "feature flag", "env var"];
    const TEST: &[&str] = &["test", "coverage"];
    const DOCUMENTATION: &[&str] = &["document", "doc comment", "readme", "changelog"];

    if SECURITY.iter().any(|k| lower.contains(k)) {
        EvidenceCategory::Security
    } else if INTERFACE.iter().any(|k| lower.contains(k)) {
        EvidenceCategory::Interface
    } else if STRUCTURAL.iter().any(|k| lower.contains(k)) {
        EvidenceCategory::Structural
    } else if CONFIGURATION.iter().any(|k| lower.contains(k)) {
        EvidenceCategory::Configuration
    } else if TEST.iter().any(|k| lower.contains(k)) {
        EvidenceCategory::Test
    } else if DOCUMENTATION.iter().any(|k| lower.contains(k)) {
        EvidenceCategory::Documentation
    } else {
        EvidenceCategory::Behavioral
    }
}

fn dedup_and_order(recommendations: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped: Vec<String> = recommendations
        .iter()
        .filter(|r| seen.insert(r.to_lowercase()))
        .cloned()
        .collect();
    deduped.sort_by_key(|r| categorize_recommendation(r).sort_key());
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderisk_core::Hop;

    fn trace_with_cited_result() -> InvestigationTrace {
        InvestigationTrace {
            hops: vec![Hop {
                hop_number: 1,
                messages_sent: 1,
                tool_calls: vec![coderisk_core::ToolCallRecord {
                    name: "query_incident_history".to_string(),
                    args: serde_json::json!({}),
                    result: coderisk_core::ToolCallOutcome::Ok {
                        result: serde_json::json!({"incidents": ["INC-42 payment outage"]}),
                    },
                }],
                tokens_used: 100,
                duration: Duration::from_millis(50),
            }],
            emergency_finished: false,
        }
    }

    #[test]
    fn confidence_penalty_applies_below_three_hops() {
        assert!((calibrate_confidence(0.9, 0) - 0.9 * 0.5).abs() < 1e-9);
        assert!((calibrate_confidence(0.9, 2) - 0.9 * 0.7).abs() < 1e-9);
    }

    #[test]
    fn confidence_unpenalized_at_or_above_three_hops() {
        assert_eq!(calibrate_confidence(0.9, 3), 0.9);
        assert_eq!(calibrate_confidence(0.9, 5), 0.9);
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        assert_eq!(calibrate_confidence(1.5, 5), 1.0);
        assert_eq!(calibrate_confidence(-0.5, 5), 0.0);
    }

    #[test]
    fn force_escalate_raises_but_never_lowers_the_final_level() {
        let mut phase0 = Phase0Result::unknown();
        phase0.force_escalate = true;
        phase0.risk = RiskLevel::Critical;
        let phase1 = Phase1Result::empty();
        let outcome = Outcome::Finished(FinishArgs {
            risk_level: RiskLevel::Low,
            confidence: 0.8,
            reasoning: "looks fine".to_string(),
            recommendations: Vec::new(),
        });
        let assessment = assemble(
            "src/auth.rs",
            &phase0,
            &phase1,
            InvestigationTrace::empty(),
            Some(&outcome),
            Duration::from_secs(1),
            BlockMode::Enforced,
        );
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn no_force_escalate_keeps_the_agents_own_level() {
        let phase0 = Phase0Result::unknown();
        let phase1 = Phase1Result::empty();
        let outcome = Outcome::Finished(FinishArgs {
            risk_level: RiskLevel::Medium,
            confidence: 0.8,
            reasoning: "moderate risk".to_string(),
            recommendations: Vec::new(),
        });
        let assessment = assemble(
            "src/auth.rs",
            &phase0,
            &phase1,
            InvestigationTrace::empty(),
            Some(&outcome),
            Duration::from_secs(1),
            BlockMode::Enforced,
        );
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn recommendations_are_deduplicated_and_security_sorts_first() {
        let recs = vec![
            "Add a changelog entry".to_string(),
            "Require security review for this auth change".to_string(),
            "add a changelog entry".to_string(),
            "Expand test coverage".to_string(),
        ];
        let ordered = dedup_and_order(&recs);
        assert_eq!(ordered.len(), 3);
        assert!(ordered[0].contains("security review"));
    }

    #[test]
    fn cited_tool_results_become_evidence_when_quoted_in_reasoning() {
        let trace = trace_with_cited_result();
        let evidence = cited_tool_evidence(&trace, "The file cites \"INC-42 payment outage\".");
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].source, "tool:query_incident_history");
    }

    #[test]
    fn uncited_tool_results_produce_no_evidence() {
        let trace = trace_with_cited_result();
        let evidence = cited_tool_evidence(&trace, "Nothing notable here.");
        assert!(evidence.is_empty());
    }

    #[test]
    fn advisory_mode_never_blocks() {
        let phase0 = Phase0Result::unknown();
        let phase1 = Phase1Result::empty();
        let outcome = Outcome::Finished(FinishArgs {
            risk_level: RiskLevel::Critical,
            confidence: 0.9,
            reasoning: "critical issue".to_string(),
            recommendations: Vec::new(),
        });
        let assessment = assemble(
            "src/auth.rs",
            &phase0,
            &phase1,
            InvestigationTrace::empty(),
            Some(&outcome),
            Duration::from_secs(1),
            BlockMode::Advisory,
        );
        assert!(!assessment.should_block);
    }

    #[test]
    fn emergency_outcome_reports_the_max_of_both_phases_and_zero_confidence() {
        let mut phase0 = Phase0Result::unknown();
        phase0.risk = RiskLevel::Medium;
        let mut phase1 = Phase1Result::empty();
        phase1.risk = RiskLevel::High;
        let outcome = Outcome::Emergency(EmergencyReason::HopBudgetExhausted);
        let assessment = assemble(
            "src/auth.rs",
            &phase0,
            &phase1,
            InvestigationTrace::empty(),
            Some(&outcome),
            Duration::from_secs(1),
            BlockMode::Enforced,
        );
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.confidence, 0.0);
    }
}
