use coderisk_core::{Phase0Result, Phase1Result, RiskLevel};
use coderisk_tools::ToolSchema;

/// Builds the fixed system prompt for one file's investigation: phase 0/1
/// summaries, the diff digest, and the tool enumeration. The prompt's shape
/// is part of the investigation contract, not a free-form template — every
/// run for the same inputs produces the same prompt.
pub fn build_system_prompt(
    file: &str,
    resolved_paths: &[String],
    phase0: &Phase0Result,
    phase1: &Phase1Result,
    diff_digest: &str,
    tools: &[ToolSchema],
    max_hops: u32,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "You are investigating incident risk for `{file}`.\n\n"
    ));
    out.push_str(&format!(
        "Resolved paths: {}\n",
        resolved_paths.join(", ")
    ));
    out.push_str(&format!("Diff summary:\n{diff_digest}\n\n"));
    out.push_str(&phase0_summary(phase0));
    out.push('\n');
    out.push_str(&phase1_summary(phase1));
    out.push('\n');
    out.push_str("Available tools:\n");
    for tool in tools {
        out.push_str(&format!("- {}: {}\n", tool.name, tool.description));
    }
    out.push('\n');
    out.push_str(
        "Investigation principles: start with the strongest signal (incident history if \
         nonzero, else ownership, else co-change, else blast radius). Prefer the narrative \
         tools (`get_incidents_with_context`, `get_cochange_with_explanations`, \
         `get_blast_radius_analysis`, `get_ownership_timeline`) when you need to cite evidence \
         in your reasoning, and the raw `query_*` tools when you only need a number to decide \
         where to look next. Gather only the evidence you need; do not call every tool.\n\n",
    );
    out.push_str(&format!(
        "When you have enough evidence, call `finish_investigation` with `risk_level`, \
         `confidence`, `reasoning`, and `recommendations`. You have at most {max_hops} tool \
         calls before the investigation is closed for you.\n",
    ));
    out
}

fn phase0_summary(phase0: &Phase0Result) -> String {
    let labels = if phase0.labels.is_empty() {
        "none".to_string()
    } else {
        phase0
            .labels
            .iter()
            .map(|l| format!("{l:?}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Phase 0 classification: risk={}, labels=[{labels}], force_escalate={}. Reasons: {}.",
        phase0.risk,
        phase0.force_escalate,
        if phase0.reasons.is_empty() {
            "none".to_string()
        } else {
            phase0.reasons.join("; ")
        }
    )
}

fn phase1_summary(phase1: &Phase1Result) -> String {
    let mut lines = vec![format!(
        "Phase 1 baseline: overall risk={}, should_escalate={}.",
        phase1.risk, phase1.should_escalate
    )];
    if let Some(m) = &phase1.coupling {
        lines.push(format!(
            "  coupling: incoming={}, outgoing={}, risk={}",
            m.value.incoming, m.value.outgoing, m.risk
        ));
    }
    if let Some(m) = &phase1.cochange {
        lines.push(format!(
            "  co-change: max_frequency={:.2}, partners={}, risk={}",
            m.value.max_frequency(),
            m.value.partners.len(),
            m.risk
        ));
    }
    if let Some(m) = &phase1.test_ratio {
        lines.push(format!(
            "  test ratio: {:.2} ({} of {} direct users are tests), risk={}",
            m.value.ratio, m.value.tests_touching, m.value.direct_users, m.risk
        ));
    }
    if let Some(m) = &phase1.ownership {
        lines.push(format!(
            "  ownership: top_owner_inactive={}, bus_factor_concentration={:.2}, risk={}",
            m.value.top_owner_inactive, m.value.bus_factor_concentration, m.risk
        ));
    }
    if let Some(m) = &phase1.incidents {
        lines.push(format!(
            "  incidents: {} linked, risk={}",
            m.value.incidents.len(),
            m.risk
        ));
    }
    lines.join("\n")
}

/// Injected when the model's turn carried no tool call — a malformed turn
/// per the investigation contract.
pub fn stall_instruction() -> &'static str {
    "Your last response did not call a tool. Call one of the listed tools, or call \
     `finish_investigation` if you are ready to conclude."
}

/// `risk_level` that an emergency-finished investigation should report: the
/// higher of Phase 0 and Phase 1's risk, since neither phase has been
/// overridden by a completed agent conclusion.
pub fn emergency_risk_level(phase0: &Phase0Result, phase1: &Phase1Result) -> RiskLevel {
    phase0.risk.max(phase1.risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderisk_core::{MetricResult, ModificationType, OwnershipMetric};

    #[test]
    fn prompt_names_the_file_and_every_tool() {
        let tools = coderisk_tools::schemas::all();
        let prompt = build_system_prompt(
            "src/auth.rs",
            &["src/auth.rs".to_string()],
            &Phase0Result::unknown(),
            &Phase1Result::empty(),
            "+10/-2 lines",
            &tools,
            5,
        );
        assert!(prompt.contains("src/auth.rs"));
        for tool in &tools {
            assert!(prompt.contains(tool.name));
        }
    }

    #[test]
    fn phase1_summary_includes_each_present_metric() {
        let mut phase1 = Phase1Result::empty();
        phase1.ownership = Some(MetricResult {
            value: OwnershipMetric {
                owners: Vec::new(),
                top_owner_inactive: true,
                bus_factor_concentration: 0.95,
                transition_date: None,
                days_since_transition: None,
            },
            risk: RiskLevel::High,
            enabled: true,
        });
        let summary = phase1_summary(&phase1);
        assert!(summary.contains("top_owner_inactive=true"));
        assert!(summary.contains("0.95"));
    }

    #[test]
    fn emergency_risk_level_is_the_max_of_both_phases() {
        let mut phase0 = Phase0Result::unknown();
        phase0.risk = RiskLevel::Medium;
        phase0.primary_label = Some(ModificationType::Behavioral);
        let mut phase1 = Phase1Result::empty();
        phase1.risk = RiskLevel::High;
        assert_eq!(emergency_risk_level(&phase0, &phase1), RiskLevel::High);
    }
}
