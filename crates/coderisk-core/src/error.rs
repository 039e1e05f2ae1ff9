use thiserror::Error;

/// The error taxonomy for the CodeRisk core.
///
/// No variant here is allowed to escape a per-file evaluation: callers at
/// the CLI boundary convert every error into an emergency `RiskAssessment`
/// rather than aborting the batch.
#[derive(Error, Debug)]
pub enum CoreRiskError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transient I/O error talking to {system}: {source}")]
    TransientIo {
        system: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("unexpected row shape from {system} for {query}: {detail}")]
    QueryShape {
        system: &'static str,
        query: String,
        detail: String,
    },

    #[error("agent stalled: no tool call for {consecutive_turns} consecutive turns")]
    AgentStall { consecutive_turns: u32 },

    #[error("budget exhausted: {resource} reached limit {limit}")]
    BudgetExhausted { resource: &'static str, limit: u64 },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invariant broken: {0}")]
    FatalInvariantBreak(String),
}

impl CoreRiskError {
    pub fn transient(system: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::TransientIo {
            system,
            source: source.into(),
        }
    }

    pub fn query_shape(
        system: &'static str,
        query: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::QueryShape {
            system,
            query: query.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreRiskError>;
