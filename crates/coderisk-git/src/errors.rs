use thiserror::Error;

pub type Result<T> = std::result::Result<T, GitIntegrationError>;

#[derive(Debug, Error)]
pub enum GitIntegrationError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("repository not found at path: {0}")]
    RepoNotFound(String),

    #[error("invalid UTF-8 in path")]
    InvalidUtf8,
}

impl From<GitIntegrationError> for coderisk_core::CoreRiskError {
    fn from(e: GitIntegrationError) -> Self {
        match e {
            GitIntegrationError::Git(inner) => coderisk_core::CoreRiskError::Git(inner),
            other => coderisk_core::CoreRiskError::transient("git", anyhow::anyhow!(other)),
        }
    }
}
