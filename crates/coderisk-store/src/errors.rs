use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("knowledge graph error: {0}")]
    Kg(#[from] surrealdb::Error),

    #[error("relational store error: {0}")]
    Rs(#[from] sqlx::Error),

    #[error("unexpected row shape from {system} for {query}: {detail}")]
    QueryShape {
        system: &'static str,
        query: String,
        detail: String,
    },

    #[error("query deadline exceeded")]
    DeadlineExceeded,

    #[error("query cancelled")]
    Cancelled,
}

impl From<StoreError> for coderisk_core::CoreRiskError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Kg(inner) => {
                coderisk_core::CoreRiskError::transient("kg", anyhow::anyhow!(inner))
            }
            StoreError::Rs(inner) => {
                coderisk_core::CoreRiskError::transient("rs", anyhow::anyhow!(inner))
            }
            StoreError::QueryShape {
                system,
                query,
                detail,
            } => coderisk_core::CoreRiskError::query_shape(system, query, detail),
            StoreError::DeadlineExceeded => {
                coderisk_core::CoreRiskError::BudgetExhausted {
                    resource: "query_deadline",
                    limit: 0,
                }
            }
            StoreError::Cancelled => coderisk_core::CoreRiskError::BudgetExhausted {
                resource: "cancellation",
                limit: 0,
            },
        }
    }
}
