use crate::errors::{Result, StoreError};
use async_trait::async_trait;
use coderisk_core::Timestamp;
use coderisk_git::KgPathLookup;
use serde::Deserialize;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::info;

#[derive(Debug, Clone)]
pub struct KgConfig {
    pub connection: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Read-only client over the pre-ingested knowledge graph. Schema is defined
/// by the ingestion pipeline; this client only ever issues `SELECT`s.
#[derive(Clone)]
pub struct KgClient {
    db: Surreal<Any>,
}

impl KgClient {
    pub async fn connect(config: KgConfig) -> Result<Self> {
        info!(connection = %config.connection, "connecting to knowledge graph");
        let db = Surreal::new::<Any>(&config.connection).await?;
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root { username, password }).await?;
        }
        db.use_ns(&config.namespace).use_db(&config.database).await?;
        Ok(Self { db })
    }

    pub fn raw(&self) -> &Surreal<Any> {
        &self.db
    }

    /// Files that `paths` depend on (`DEPENDS_ON`/`IMPORTS` outgoing), one
    /// hop, bounded by `limit`.
    pub async fn dependency_neighbours_outgoing(
        &self,
        paths: &[String],
        limit: u32,
    ) -> Result<Vec<String>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let sql = "SELECT VALUE path FROM (
            SELECT ->depends_on->file.path AS path FROM file WHERE path IN $paths
            UNION
            SELECT ->imports->file.path AS path FROM file WHERE path IN $paths
        ) LIMIT $limit";
        let mut resp = self
            .db
            .query(sql)
            .bind(("paths", paths.to_vec()))
            .bind(("limit", limit as i64))
            .await?;
        let rows: Vec<String> = resp.take(0)?;
        Ok(rows)
    }

    /// Files that depend on `paths` (`DEPENDS_ON`/`IMPORTS` incoming), one
    /// hop, bounded by `limit`. This is the blast-radius direction: the set
    /// of downstream dependents, not dependencies.
    pub async fn dependency_neighbours_incoming(
        &self,
        paths: &[String],
        limit: u32,
    ) -> Result<Vec<String>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let sql = "SELECT VALUE path FROM (
            SELECT <-depends_on<-file.path AS path FROM file WHERE path IN $paths
            UNION
            SELECT <-imports<-file.path AS path FROM file WHERE path IN $paths
        ) LIMIT $limit";
        let mut resp = self
            .db
            .query(sql)
            .bind(("paths", paths.to_vec()))
            .bind(("limit", limit as i64))
            .await?;
        let rows: Vec<String> = resp.take(0)?;
        Ok(rows)
    }

    /// Raw `CO_CHANGED` rows: (partner_path, co_changes, total_commits_f,
    /// total_commits_g). Frequency is derived by the caller.
    pub async fn cochange_candidates(
        &self,
        paths: &[String],
        window_days: u32,
    ) -> Result<Vec<CochangeRow>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let sql = "SELECT partner_path, co_changes, total_commits_a, total_commits_b,
                          example_commit_shas
                   FROM cochange_view
                   WHERE file_path IN $paths AND window_days <= $window_days
                   LIMIT 100";
        let mut resp = self
            .db
            .query(sql)
            .bind(("paths", paths.to_vec()))
            .bind(("window_days", window_days as i64))
            .await?;
        let rows: Vec<CochangeRow> = resp.take(0)?;
        Ok(rows)
    }

    /// Commits (sha + timestamp) authored against any of `paths`.
    pub async fn commits_touching(
        &self,
        paths: &[String],
        limit: u32,
    ) -> Result<Vec<CommitRow>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let sql = "SELECT <-modified<-commit.{sha, committed_at} AS commits
                   FROM file WHERE path IN $paths
                   ORDER BY committed_at DESC
                   LIMIT $limit";
        let mut resp = self
            .db
            .query(sql)
            .bind(("paths", paths.to_vec()))
            .bind(("limit", limit as i64))
            .await?;
        let rows: Vec<CommitRow> = resp.take(0)?;
        Ok(rows)
    }

    /// `AUTHORED`/`MODIFIED` rollup per developer over `paths`.
    pub async fn ownership_rows(&self, paths: &[String]) -> Result<Vec<OwnershipRow>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let sql = "SELECT developer.email AS email, count() AS commit_count,
                          math::max(commit.committed_at) AS last_commit
                   FROM modified
                   WHERE out.path IN $paths
                   GROUP BY developer.email
                   ORDER BY commit_count DESC";
        let mut resp = self.db.query(sql).bind(("paths", paths.to_vec())).await?;
        let rows: Vec<OwnershipRow> = resp.take(0)?;
        Ok(rows)
    }

    /// Issue/PR links (`FIXED_BY`/`ASSOCIATED_WITH`) touching commits that
    /// modified any of `paths`, within `days_back`.
    pub async fn incident_links(
        &self,
        paths: &[String],
        days_back: u32,
    ) -> Result<Vec<IncidentLinkRow>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let sql = "SELECT issue.number AS issue_number, pr.number AS pr_number,
                          commit.sha AS commit_sha, link_type, confidence,
                          detection_method
                   FROM (fixed_by, associated_with)
                   WHERE confidence >= 0.5
                     AND commit.sha IN (
                         SELECT VALUE sha FROM commit
                         WHERE ->modified->file.path IN $paths
                           AND committed_at >= time::now() - $days_back * 1d
                     )
                   ORDER BY confidence DESC";
        let mut resp = self
            .db
            .query(sql)
            .bind(("paths", paths.to_vec()))
            .bind(("days_back", days_back as i64))
            .await?;
        let rows: Vec<IncidentLinkRow> = resp.take(0)?;
        Ok(rows)
    }
}

#[async_trait]
impl KgPathLookup for KgClient {
    async fn path_exists(&self, _repo_id: &str, path: &str) -> coderisk_core::Result<bool> {
        let mut resp = self
            .db
            .query("SELECT VALUE path FROM file WHERE path = $path LIMIT 1")
            .bind(("path", path.to_string()))
            .await
            .map_err(StoreError::from)?;
        let rows: Vec<String> = resp.take(0).map_err(StoreError::from)?;
        Ok(!rows.is_empty())
    }

    async fn existing_paths(
        &self,
        _repo_id: &str,
        candidates: &[String],
    ) -> coderisk_core::Result<Vec<String>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let mut resp = self
            .db
            .query("SELECT VALUE path FROM file WHERE path IN $candidates")
            .bind(("candidates", candidates.to_vec()))
            .await
            .map_err(StoreError::from)?;
        let rows: Vec<String> = resp.take(0).map_err(StoreError::from)?;
        Ok(rows)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CochangeRow {
    pub partner_path: String,
    pub co_changes: i64,
    pub total_commits_a: i64,
    pub total_commits_b: i64,
    pub example_commit_shas: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRow {
    pub sha: String,
    pub committed_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnershipRow {
    pub email: String,
    pub commit_count: i64,
    pub last_commit: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentLinkRow {
    pub issue_number: i64,
    pub pr_number: Option<i64>,
    pub commit_sha: String,
    pub link_type: String,
    pub confidence: f64,
    pub detection_method: String,
}
