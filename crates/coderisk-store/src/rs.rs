use crate::errors::Result;
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;

/// Read-only client over the relational store's mirrored GitHub artifacts
/// (`github_issues`, `github_pull_requests`, `github_commits`, …) plus the
/// metric-feedback tables.
#[derive(Clone)]
pub struct RsClient {
    pool: PgPool,
}

impl RsClient {
    pub async fn connect(dsn: &str) -> Result<Self> {
        info!("connecting to relational store");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Enrichment rows for a set of issue numbers: title, body, labels,
    /// timestamps, author association.
    pub async fn issue_bodies(&self, issue_numbers: &[i64]) -> Result<Vec<IssueRow>> {
        if issue_numbers.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, IssueRow>(
            "SELECT number, title, body, labels, created_at, closed_at,
                    author_login, author_association
             FROM github_issues
             WHERE number = ANY($1)",
        )
        .bind(issue_numbers)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Raw patch/body for a single commit, used by `get_commit_patch`.
    pub async fn commit_patch(&self, sha: &str) -> Result<Option<CommitPatchRow>> {
        let row = sqlx::query_as::<_, CommitPatchRow>(
            "SELECT sha, message, patch, additions, deletions, files_changed
             FROM github_commits
             WHERE sha = $1",
        )
        .bind(sha)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// `author_association` / `days_since_last_commit` enrichment for a set
    /// of developer emails.
    pub async fn contributor_roles(&self, emails: &[String]) -> Result<Vec<ContributorRow>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ContributorRow>(
            "SELECT email, author_association
             FROM github_contributors
             WHERE email = ANY($1)",
        )
        .bind(emails)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Message/author enrichment for a batch of commit SHAs, used by
    /// `get_recent_commits` after the KG side has resolved which commits
    /// touched the resolved paths.
    pub async fn commits_by_sha(&self, shas: &[String]) -> Result<Vec<CommitSummaryRow>> {
        if shas.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, CommitSummaryRow>(
            "SELECT sha, message, author_email
             FROM github_commits
             WHERE sha = ANY($1)",
        )
        .bind(shas)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Appends one `{metric_name, outcome}` event and rolls it up into
    /// `metric_stats`. The in-process `MetricRegistry` is the fast-path read;
    /// this keeps an external, queryable copy.
    pub async fn record_metric_feedback(
        &self,
        metric_name: &str,
        file_path: &str,
        metric_value: &serde_json::Value,
        true_positive: Option<bool>,
    ) -> Result<()> {
        let feedback = match true_positive {
            Some(true) => Some("true_positive"),
            Some(false) => Some("false_positive"),
            None => None,
        };
        sqlx::query(
            "INSERT INTO metric_validations (metric_name, file_path, metric_value, user_feedback)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(metric_name)
        .bind(file_path)
        .bind(metric_value)
        .bind(feedback)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, FromRow, Deserialize)]
pub struct IssueRow {
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    pub labels: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub closed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub author_login: String,
    pub author_association: Option<String>,
}

#[derive(Debug, Clone, FromRow, Deserialize)]
pub struct CommitPatchRow {
    pub sha: String,
    pub message: String,
    pub patch: Option<String>,
    pub additions: i32,
    pub deletions: i32,
    pub files_changed: i32,
}

#[derive(Debug, Clone, FromRow, Deserialize)]
pub struct CommitSummaryRow {
    pub sha: String,
    pub message: String,
    pub author_email: String,
}

#[derive(Debug, Clone, FromRow, Deserialize)]
pub struct ContributorRow {
    pub email: String,
    pub author_association: Option<String>,
}
