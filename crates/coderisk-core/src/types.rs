use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Risk levels ordered low to high; `Ord` is derived from declaration order
/// so `max()`/comparisons work directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Integer mapping used by the Phase 0 aggregation formula: VERY_LOW=1
    /// .. CRITICAL=5. `Minimal` here plays the role of VERY_LOW.
    pub fn as_score(self) -> u8 {
        match self {
            RiskLevel::Minimal => 1,
            RiskLevel::Low => 2,
            RiskLevel::Medium => 3,
            RiskLevel::High => 4,
            RiskLevel::Critical => 5,
        }
    }

    /// Re-bucket a weighted arithmetic score (`max + 0.3 * sum_others`) back
    /// into a level. Scores above the CRITICAL band saturate at CRITICAL.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.5 {
            RiskLevel::Critical
        } else if score >= 3.5 {
            RiskLevel::High
        } else if score >= 2.5 {
            RiskLevel::Medium
        } else if score >= 1.5 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// Multi-label modification classification. Each label carries a fixed base
/// risk used by the aggregation formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    Security,
    Interface,
    Structural,
    Configuration,
    Behavioral,
    Performance,
    TemporalPattern,
    Ownership,
    TestQuality,
    Documentation,
}

impl ModificationType {
    pub fn base_risk(self) -> RiskLevel {
        match self {
            ModificationType::Security => RiskLevel::Critical,
            ModificationType::Interface => RiskLevel::High,
            ModificationType::Structural => RiskLevel::High,
            ModificationType::Configuration => RiskLevel::Medium,
            ModificationType::Behavioral => RiskLevel::Medium,
            ModificationType::Performance => RiskLevel::Medium,
            ModificationType::TemporalPattern => RiskLevel::Medium,
            ModificationType::Ownership => RiskLevel::Medium,
            ModificationType::TestQuality => RiskLevel::Low,
            ModificationType::Documentation => RiskLevel::Minimal,
        }
    }

    /// Priority used to pick the primary label when several match (higher
    /// wins; ties broken by declaration order in the match above).
    pub fn priority(self) -> u8 {
        self.base_risk().as_score()
    }
}

/// Timestamps in the KG may be stored as Unix epoch seconds or ISO-8601
/// strings. Both are normalised on ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(i64),
    Iso(String),
}

impl Timestamp {
    pub fn to_utc(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            Timestamp::Epoch(secs) => chrono::DateTime::from_timestamp(*secs, 0)
                .unwrap_or_else(|| chrono::DateTime::from_timestamp(0, 0).unwrap()),
            Timestamp::Iso(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::DateTime::from_timestamp(0, 0).unwrap()),
        }
    }
}

/// A single piece of supporting evidence in a `RiskAssessment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub category: EvidenceCategory,
    pub description: String,
    /// Source this evidence was derived from, e.g. "phase0:security_keywords",
    /// "phase1:cochange", "tool:get_incidents_with_context".
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    Security,
    Interface,
    Structural,
    Configuration,
    Behavioral,
    Ownership,
    CoChange,
    Incident,
    Test,
    Documentation,
}

impl EvidenceCategory {
    /// Ordering key for the assembler's recommendation sort: security first,
    /// then interface, structural, configuration, test, documentation.
    pub fn sort_key(self) -> u8 {
        match self {
            EvidenceCategory::Security => 0,
            EvidenceCategory::Interface => 1,
            EvidenceCategory::Structural => 2,
            EvidenceCategory::Configuration => 3,
            EvidenceCategory::Behavioral => 4,
            EvidenceCategory::Ownership => 5,
            EvidenceCategory::CoChange => 6,
            EvidenceCategory::Incident => 7,
            EvidenceCategory::Test => 8,
            EvidenceCategory::Documentation => 9,
        }
    }
}

/// One round trip of (LLM response -> tool execution -> tool result
/// appended).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hop {
    pub hop_number: u32,
    pub messages_sent: u32,
    pub tool_calls: Vec<ToolCallRecord>,
    pub tokens_used: u64,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub args: serde_json::Value,
    pub result: ToolCallOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolCallOutcome {
    Ok { result: serde_json::Value },
    Error { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationTrace {
    pub hops: Vec<Hop>,
    /// True if the loop was stopped by the hop/token/stall budget rather
    /// than the agent calling `finish_investigation`.
    pub emergency_finished: bool,
}

impl InvestigationTrace {
    pub fn empty() -> Self {
        Self {
            hops: Vec::new(),
            emergency_finished: false,
        }
    }

    /// True when the last hop's terminal tool call is `finish_investigation`
    /// or the investigation was emergency-finished.
    pub fn has_terminal_call(&self) -> bool {
        if self.emergency_finished {
            return true;
        }
        self.hops
            .last()
            .and_then(|h| h.tool_calls.last())
            .map(|tc| tc.name == "finish_investigation")
            .unwrap_or(false)
    }
}

/// Output of Phase 0 pre-analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase0Result {
    pub skip_all: bool,
    pub force_escalate: bool,
    pub risk: RiskLevel,
    pub primary_label: Option<ModificationType>,
    pub labels: Vec<ModificationType>,
    pub reasons: Vec<String>,
}

impl Phase0Result {
    pub fn doc_only() -> Self {
        Self {
            skip_all: true,
            force_escalate: false,
            risk: RiskLevel::Low,
            primary_label: Some(ModificationType::Documentation),
            labels: vec![ModificationType::Documentation],
            reasons: vec!["Documentation-only change".to_string()],
        }
    }

    pub fn unknown() -> Self {
        Self {
            skip_all: false,
            force_escalate: false,
            risk: RiskLevel::Minimal,
            primary_label: None,
            labels: Vec::new(),
            reasons: vec!["empty or unrecognised input, recommend Phase 1".to_string()],
        }
    }
}

/// Per-metric risk with the raw supporting numbers, so the assembler and
/// the CLI's `--explain` mode can render a sentence from it without
/// re-deriving the band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricResult<T> {
    pub value: T,
    pub risk: RiskLevel,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMetric {
    pub incoming: u32,
    pub outgoing: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoChangePartner {
    pub partner_path: String,
    pub frequency: f64,
    pub co_changes: u32,
    pub example_messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoChangeMetric {
    pub partners: Vec<CoChangePartner>,
}

impl CoChangeMetric {
    pub fn max_frequency(&self) -> f64 {
        self.partners
            .iter()
            .map(|p| p.frequency)
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRatioMetric {
    pub tests_touching: u32,
    pub direct_users: u32,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerEntry {
    pub email: String,
    pub commit_count: u32,
    pub last_commit: chrono::DateTime<chrono::Utc>,
    pub is_active: bool,
    pub days_since_commit: i64,
    pub author_association: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipMetric {
    pub owners: Vec<OwnerEntry>,
    pub top_owner_inactive: bool,
    pub bus_factor_concentration: f64,
    /// When the current top owner overtook the previous one, if a
    /// transition occurred.
    pub transition_date: Option<chrono::DateTime<chrono::Utc>>,
    pub days_since_transition: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub issue_number: u64,
    pub pr_number: Option<u64>,
    pub commit_sha: String,
    pub link_type: String,
    pub confidence: f64,
    pub detection_method: String,
    pub evidence: Vec<String>,
    pub issue_title: String,
    pub issue_body: Option<String>,
    pub labels: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub closed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub author_login: String,
    pub author_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentMetric {
    pub incidents: Vec<Incident>,
}

/// A recent commit touching one of the resolved paths, as returned by
/// `get_recent_commits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author_email: String,
    pub committed_at: chrono::DateTime<chrono::Utc>,
}

/// One downstream dependent in a blast-radius traversal, with its own
/// incident count over the trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastRadiusEntry {
    pub path: String,
    pub incident_count_180d: u32,
}

/// Phase 1 baseline metrics output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase1Result {
    pub coupling: Option<MetricResult<CouplingMetric>>,
    pub cochange: Option<MetricResult<CoChangeMetric>>,
    pub test_ratio: Option<MetricResult<TestRatioMetric>>,
    pub ownership: Option<MetricResult<OwnershipMetric>>,
    pub incidents: Option<MetricResult<IncidentMetric>>,
    pub risk: RiskLevel,
    pub should_escalate: bool,
}

impl Phase1Result {
    /// An empty resolved-path set means a brand-new file: all metrics are
    /// empty, risk is LOW, no escalation.
    pub fn empty() -> Self {
        Self {
            coupling: None,
            cochange: None,
            test_ratio: None,
            ownership: None,
            incidents: None,
            risk: RiskLevel::Low,
            should_escalate: false,
        }
    }
}

/// A semantic sub-file unit (function, method, class), addressed the same
/// way a `File` is: by a canonical path plus a resolver indirection for
/// renamed/moved blocks. Not exposed by any tool or query in the core as
/// specified; kept as a defined shape so a future block-level ownership
/// surface (§9 "Open questions") has a type to build on without redesigning
/// the resolver pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    pub canonical_file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub historical_block_names: Vec<String>,
    pub familiarity_map: std::collections::HashMap<String, u32>,
    pub last_modified_at: chrono::DateTime<chrono::Utc>,
    pub incident_count: u32,
    pub risk_score: f64,
}

/// The final, immutable assessment produced for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub file_path: String,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub evidence: Vec<EvidenceItem>,
    pub recommendations: Vec<String>,
    pub summary: String,
    pub trace: InvestigationTrace,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub should_block: bool,
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
    fn risk_level_ordering_is_low_to_critical() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(RiskLevel::High.max(RiskLevel::Critical), RiskLevel::Critical);
    }

    #[test]
    fn timestamp_normalizes_epoch_and_iso_to_same_instant() {
        let epoch = Timestamp::Epoch(1_700_000_000);
        let iso = Timestamp::Iso("2023-11-14T22:13:20+00:00".to_string());
        assert_eq!(epoch.to_utc(), iso.to_utc());
    }

    #[test]
    fn trace_terminality_requires_finish_investigation_or_emergency() {
        let mut trace = InvestigationTrace::empty();
        assert!(!trace.has_terminal_call());
        trace.emergency_finished = true;
        assert!(trace.has_terminal_call());
    }
}
