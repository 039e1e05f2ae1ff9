use crate::types::Tool;
use coderisk_store::HybridQueries;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_COCHANGE_THRESHOLD: f64 = 0.0;
const DEFAULT_COCHANGE_WINDOW_DAYS: u32 = 90;
const DEFAULT_INCIDENT_WINDOW_DAYS: u32 = 180;
const DEFAULT_COMMIT_LIMIT: u32 = 10;
const DEFAULT_COUPLING_LIMIT: u32 = 200;
/// Commit window replayed for transition dating, matching
/// `coderisk-phase1::ownership`'s own bound so the baseline metric and this
/// agent-facing tool derive the same fact from the same bounded history.
const TRANSITION_COMMIT_LIMIT: u32 = 50;

/// Dispatches agent tool calls onto the hybrid query layer. A failed call
/// never propagates as `Result::Err`: every outcome, success or failure, is
/// a `serde_json::Value` fed back to the model as the next tool-result
/// message, so the agent can see and reason about its own mistakes.
pub struct ToolExecutor<'a> {
    queries: &'a HybridQueries,
    deadline: Duration,
}

impl<'a> ToolExecutor<'a> {
    pub fn new(queries: &'a HybridQueries, deadline: Duration) -> Self {
        Self { queries, deadline }
    }

    pub async fn execute(&self, name: &str, args: &Value) -> Value {
        let tool = match precheck(name) {
            Ok(tool) => tool,
            Err(payload) => return payload,
        };

        match tool {
            Tool::QueryOwnership => self.query_ownership(args).await,
            Tool::GetOwnershipTimeline => self.query_ownership_timeline(args).await,
            Tool::QueryCochangePartners | Tool::GetCochangeWithExplanations => {
                self.query_cochange_partners(args).await
            }
            Tool::QueryIncidentHistory | Tool::GetIncidentsWithContext => {
                self.query_incident_history(args).await
            }
            Tool::QueryBlastRadius | Tool::GetBlastRadiusAnalysis => {
                self.query_blast_radius(args).await
            }
            Tool::GetCommitPatch => self.get_commit_patch(args).await,
            Tool::QueryRecentCommits => self.query_recent_commits(args).await,
            Tool::FinishInvestigation => unreachable!("handled by the is_terminal guard above"),
        }
    }

    async fn query_ownership(&self, args: &Value) -> Value {
        #[derive(Deserialize)]
        struct Args {
            paths: Vec<String>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args.clone()) else {
            return bad_args();
        };
        if args.paths.is_empty() {
            return json!({ "error": "paths must not be empty" });
        }
        match self
            .queries
            .get_ownership_history_for(&args.paths, self.deadline)
            .await
        {
            Ok(owners) => json!({ "owners": owners }),
            Err(e) => store_error(e),
        }
    }

    /// Like `query_ownership`, but also replays a bounded window of recent
    /// commits (`coderisk_core::compute_transition`) to report when the
    /// current top owner overtook whoever led before, per SPEC_FULL.md §3's
    /// ownership-transition supplement.
    async fn query_ownership_timeline(&self, args: &Value) -> Value {
        #[derive(Deserialize)]
        struct Args {
            paths: Vec<String>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args.clone()) else {
            return bad_args();
        };
        if args.paths.is_empty() {
            return json!({ "error": "paths must not be empty" });
        }
        let (owners_result, commits_result) = tokio::join!(
            self.queries
                .get_ownership_history_for(&args.paths, self.deadline),
            self.queries
                .get_recent_commits(&args.paths, TRANSITION_COMMIT_LIMIT, self.deadline),
        );
        let owners = match owners_result {
            Ok(owners) => owners,
            Err(e) => return store_error(e),
        };
        let commits = commits_result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "recent-commits query failed, omitting ownership transition");
            Vec::new()
        });
        let (transition_date, days_since_transition) =
            coderisk_core::compute_transition(&owners, &commits);
        json!({
            "owners": owners,
            "transition_date": transition_date,
            "days_since_transition": days_since_transition,
        })
    }

    async fn query_cochange_partners(&self, args: &Value) -> Value {
        #[derive(Deserialize)]
        struct Args {
            paths: Vec<String>,
            #[serde(default)]
            frequency_threshold: Option<f64>,
            #[serde(default)]
            days_back: Option<u32>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args.clone()) else {
            return bad_args();
        };
        if args.paths.is_empty() {
            return json!({ "error": "paths must not be empty" });
        }
        let threshold = args
            .frequency_threshold
            .unwrap_or(DEFAULT_COCHANGE_THRESHOLD)
            .clamp(0.0, 1.0);
        let window_days = args
            .days_back
            .unwrap_or(DEFAULT_COCHANGE_WINDOW_DAYS)
            .clamp(1, 365);
        match self
            .queries
            .get_cochange_partners_with_context(&args.paths, threshold, window_days, self.deadline)
            .await
        {
            Ok(partners) => json!({ "partners": partners }),
            Err(e) => store_error(e),
        }
    }

    async fn query_incident_history(&self, args: &Value) -> Value {
        #[derive(Deserialize)]
        struct Args {
            paths: Vec<String>,
            #[serde(default)]
            days_back: Option<u32>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args.clone()) else {
            return bad_args();
        };
        if args.paths.is_empty() {
            return json!({ "error": "paths must not be empty" });
        }
        let days_back = args
            .days_back
            .unwrap_or(DEFAULT_INCIDENT_WINDOW_DAYS)
            .clamp(1, 365);
        match self
            .queries
            .get_incident_history_for(&args.paths, days_back, self.deadline)
            .await
        {
            Ok(incidents) => json!({ "incidents": incidents }),
            Err(e) => store_error(e),
        }
    }

    async fn query_blast_radius(&self, args: &Value) -> Value {
        #[derive(Deserialize)]
        struct Args {
            path: String,
        }
        let Ok(args) = serde_json::from_value::<Args>(args.clone()) else {
            return bad_args();
        };
        if args.path.is_empty() {
            return json!({ "error": "path must not be empty" });
        }
        match self
            .queries
            .get_blast_radius_with_incidents(&args.path, self.deadline)
            .await
        {
            Ok(entries) => json!({ "dependents": entries }),
            Err(e) => store_error(e),
        }
    }

    async fn get_commit_patch(&self, args: &Value) -> Value {
        #[derive(Deserialize)]
        struct Args {
            sha: String,
        }
        let Ok(args) = serde_json::from_value::<Args>(args.clone()) else {
            return bad_args();
        };
        if args.sha.is_empty() {
            return json!({ "error": "sha must not be empty" });
        }
        match self.queries.get_commit_patch(&args.sha, self.deadline).await {
            Ok(Some(patch)) => json!({ "patch": patch }),
            Ok(None) => json!({ "patch": null, "note": "no patch recorded for this commit" }),
            Err(e) => store_error(e),
        }
    }

    async fn query_recent_commits(&self, args: &Value) -> Value {
        #[derive(Deserialize)]
        struct Args {
            paths: Vec<String>,
            #[serde(default)]
            limit: Option<u32>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args.clone()) else {
            return bad_args();
        };
        if args.paths.is_empty() {
            return json!({ "error": "paths must not be empty" });
        }
        let limit = args.limit.unwrap_or(DEFAULT_COMMIT_LIMIT).clamp(1, 50);
        match self
            .queries
            .get_recent_commits(&args.paths, limit, self.deadline)
            .await
        {
            Ok(commits) => json!({ "commits": commits }),
            Err(e) => store_error(e),
        }
    }
}

/// Exposed so a caller fetching structural coupling (not agent-exposed as
/// its own tool; it is pre-computed in Phase 1) can reuse the same limit
/// default the executor would use for consistency.
pub fn default_coupling_limit() -> u32 {
    DEFAULT_COUPLING_LIMIT
}

/// Resolves a tool name to a dispatchable `Tool`, rejecting unknown names
/// and `finish_investigation` (intercepted by the agent loop before it ever
/// reaches the executor) without touching the store. Pulled out of
/// `execute` so these checks are unit-testable without a live connection.
fn precheck(name: &str) -> std::result::Result<Tool, Value> {
    let Some(tool) = Tool::from_name(name) else {
        return Err(json!({ "error": "unknown_tool" }));
    };
    if tool.is_terminal() {
        return Err(json!({ "error": "finish_investigation_is_handled_by_the_agent_loop" }));
    }
    Ok(tool)
}

fn bad_args() -> Value {
    json!({ "error": "invalid_arguments" })
}

fn store_error(e: coderisk_store::StoreError) -> Value {
    json!({ "error": e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_name_returns_error_payload() {
        let result = precheck("delete_everything").unwrap_err();
        assert_eq!(result["error"], "unknown_tool");
    }

    #[test]
    fn finish_investigation_is_rejected_before_dispatch() {
        let result = precheck("finish_investigation").unwrap_err();
        assert!(result["error"].is_string());
    }

    #[test]
    fn every_non_terminal_tool_passes_precheck() {
        for tool in Tool::ALL {
            if tool.is_terminal() {
                continue;
            }
            assert_eq!(precheck(tool.name()), Ok(tool));
        }
    }
}
