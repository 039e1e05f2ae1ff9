/// The closed set of tools the agent may call. This is a tagged-variant
/// registry rather than dynamic reflection: the agent is told these names
/// and nothing else, and the executor dispatch is an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    QueryOwnership,
    QueryCochangePartners,
    GetCochangeWithExplanations,
    QueryIncidentHistory,
    GetIncidentsWithContext,
    QueryBlastRadius,
    GetBlastRadiusAnalysis,
    GetCommitPatch,
    QueryRecentCommits,
    GetOwnershipTimeline,
    FinishInvestigation,
}

impl Tool {
    pub const ALL: [Tool; 11] = [
        Tool::QueryOwnership,
        Tool::QueryCochangePartners,
        Tool::GetCochangeWithExplanations,
        Tool::QueryIncidentHistory,
        Tool::GetIncidentsWithContext,
        Tool::QueryBlastRadius,
        Tool::GetBlastRadiusAnalysis,
        Tool::GetCommitPatch,
        Tool::QueryRecentCommits,
        Tool::GetOwnershipTimeline,
        Tool::FinishInvestigation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::QueryOwnership => "query_ownership",
            Tool::QueryCochangePartners => "query_cochange_partners",
            Tool::GetCochangeWithExplanations => "get_cochange_with_explanations",
            Tool::QueryIncidentHistory => "query_incident_history",
            Tool::GetIncidentsWithContext => "get_incidents_with_context",
            Tool::QueryBlastRadius => "query_blast_radius",
            Tool::GetBlastRadiusAnalysis => "get_blast_radius_analysis",
            Tool::GetCommitPatch => "get_commit_patch",
            Tool::QueryRecentCommits => "query_recent_commits",
            Tool::GetOwnershipTimeline => "get_ownership_timeline",
            Tool::FinishInvestigation => "finish_investigation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Tool::ALL.into_iter().find(|t| t.name() == name)
    }

    /// True for the one tool the agent reducer intercepts itself instead of
    /// routing through the executor.
    pub fn is_terminal(self) -> bool {
        matches!(self, Tool::FinishInvestigation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_name_round_trips_through_from_name() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        assert_eq!(Tool::from_name("delete_everything"), None);
    }

    #[test]
    fn only_finish_investigation_is_terminal() {
        for tool in Tool::ALL {
            assert_eq!(tool.is_terminal(), tool == Tool::FinishInvestigation);
        }
    }
}
