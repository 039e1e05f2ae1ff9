use serde_json::{json, Value};

/// One tool's name/description/JSON-Schema triple, handed to an `LLMProvider`
/// as a `ToolDefinition`. Built by hand with `json!()` rather than derived
/// via `schemars`, matching the parameter shapes the executor actually
/// accepts (including the clamped ranges, which the schema documents but
/// does not enforce — enforcement lives in `executor`).
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

fn paths_param() -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": "Repository-relative file paths to investigate."
    })
}

pub fn query_ownership() -> ToolSchema {
    ToolSchema {
        name: "query_ownership",
        description: "List the top committers for a set of files, most commits first, with activity recency.",
        parameters: json!({
            "type": "object",
            "properties": { "paths": paths_param() },
            "required": ["paths"]
        }),
    }
}

pub fn query_cochange_partners() -> ToolSchema {
    ToolSchema {
        name: "query_cochange_partners",
        description: "List files that historically change together with the given files, above a frequency threshold.",
        parameters: json!({
            "type": "object",
            "properties": {
                "paths": paths_param(),
                "frequency_threshold": {
                    "type": "number",
                    "description": "Minimum co-change frequency to report, clamped to [0, 1]. Defaults to 0.",
                    "minimum": 0.0,
                    "maximum": 1.0
                },
                "days_back": {
                    "type": "integer",
                    "description": "How many days of commit history to consider, clamped to [1, 365]. Defaults to 90.",
                    "minimum": 1,
                    "maximum": 365
                }
            },
            "required": ["paths"]
        }),
    }
}

pub fn get_cochange_with_explanations() -> ToolSchema {
    ToolSchema {
        name: "get_cochange_with_explanations",
        description: "Like query_cochange_partners, but each partner includes example commit messages explaining why the files change together.",
        parameters: json!({
            "type": "object",
            "properties": {
                "paths": paths_param(),
                "frequency_threshold": {
                    "type": "number",
                    "description": "Minimum co-change frequency to report, clamped to [0, 1]. Defaults to 0.",
                    "minimum": 0.0,
                    "maximum": 1.0
                },
                "days_back": {
                    "type": "integer",
                    "description": "How many days of commit history to consider, clamped to [1, 365]. Defaults to 90.",
                    "minimum": 1,
                    "maximum": 365
                }
            },
            "required": ["paths"]
        }),
    }
}

pub fn query_incident_history() -> ToolSchema {
    ToolSchema {
        name: "query_incident_history",
        description: "List production incidents (issues/PRs) historically linked to the given files.",
        parameters: json!({
            "type": "object",
            "properties": {
                "paths": paths_param(),
                "days_back": {
                    "type": "integer",
                    "description": "How many days back to search, clamped to [1, 365]. Defaults to 180.",
                    "minimum": 1,
                    "maximum": 365
                }
            },
            "required": ["paths"]
        }),
    }
}

pub fn get_incidents_with_context() -> ToolSchema {
    ToolSchema {
        name: "get_incidents_with_context",
        description: "Like query_incident_history, but renders each incident as a narrative sentence citing the issue title and resolution.",
        parameters: json!({
            "type": "object",
            "properties": {
                "paths": paths_param(),
                "days_back": {
                    "type": "integer",
                    "description": "How many days back to search, clamped to [1, 365]. Defaults to 180.",
                    "minimum": 1,
                    "maximum": 365
                }
            },
            "required": ["paths"]
        }),
    }
}

pub fn query_blast_radius() -> ToolSchema {
    ToolSchema {
        name: "query_blast_radius",
        description: "List the files that depend on a single given file (its one-hop dependents).",
        parameters: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "A single repository-relative file path." }
            },
            "required": ["path"]
        }),
    }
}

pub fn get_blast_radius_analysis() -> ToolSchema {
    ToolSchema {
        name: "get_blast_radius_analysis",
        description: "Like query_blast_radius, but each dependent is annotated with its own incident count over the last 180 days and a one-line risk characterization.",
        parameters: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "A single repository-relative file path." }
            },
            "required": ["path"]
        }),
    }
}

pub fn get_commit_patch() -> ToolSchema {
    ToolSchema {
        name: "get_commit_patch",
        description: "Fetch the unified diff patch for a single commit by its SHA.",
        parameters: json!({
            "type": "object",
            "properties": {
                "sha": { "type": "string", "description": "A git commit SHA." }
            },
            "required": ["sha"]
        }),
    }
}

pub fn query_recent_commits() -> ToolSchema {
    ToolSchema {
        name: "query_recent_commits",
        description: "List the most recent commits touching the given files.",
        parameters: json!({
            "type": "object",
            "properties": {
                "paths": paths_param(),
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of commits to return, clamped to [1, 50]. Defaults to 10.",
                    "minimum": 1,
                    "maximum": 50
                }
            },
            "required": ["paths"]
        }),
    }
}

pub fn get_ownership_timeline() -> ToolSchema {
    ToolSchema {
        name: "get_ownership_timeline",
        description: "Like query_ownership, but also reports transition_date/days_since_transition: when the current top owner's running commit count overtook whoever led before, useful for spotting an ownership transition.",
        parameters: json!({
            "type": "object",
            "properties": { "paths": paths_param() },
            "required": ["paths"]
        }),
    }
}

pub fn finish_investigation() -> ToolSchema {
    ToolSchema {
        name: "finish_investigation",
        description: "Conclude the investigation and report a final risk assessment. Call this once you have enough evidence, or immediately if no further investigation is needed.",
        parameters: json!({
            "type": "object",
            "properties": {
                "risk_level": {
                    "type": "string",
                    "enum": ["low", "medium", "high", "critical"],
                    "description": "The overall risk level this change poses."
                },
                "confidence": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "description": "Confidence in this assessment, from 0 to 1."
                },
                "reasoning": {
                    "type": "string",
                    "description": "A short explanation of the risk level, citing the evidence gathered."
                },
                "recommendations": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Concrete actions the author should take before merging."
                }
            },
            "required": ["risk_level", "confidence", "reasoning"]
        }),
    }
}

/// All tool schemas in the order they should be presented to the agent.
pub fn all() -> Vec<ToolSchema> {
    vec![
        query_ownership(),
        query_cochange_partners(),
        get_cochange_with_explanations(),
        query_incident_history(),
        get_incidents_with_context(),
        query_blast_radius(),
        get_blast_radius_analysis(),
        get_commit_patch(),
        query_recent_commits(),
        get_ownership_timeline(),
        finish_investigation(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tool;

    #[test]
    fn schema_set_covers_every_tool_exactly_once() {
        let names: Vec<&str> = all().into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), Tool::ALL.len());
        for tool in Tool::ALL {
            assert_eq!(names.iter().filter(|n| **n == tool.name()).count(), 1);
        }
    }

    #[test]
    fn every_schema_parameters_is_an_object_schema() {
        for schema in all() {
            assert_eq!(schema.parameters["type"], "object");
        }
    }
}
