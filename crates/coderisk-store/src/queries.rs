use crate::errors::Result;
use crate::kg::KgClient;
use crate::retry::with_deadline_retry;
use crate::rs::RsClient;
use coderisk_core::{
    BlastRadiusEntry, CommitSummary, CouplingMetric, Incident, OwnerEntry, TestRatioMetric,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Composed read-side queries joining the knowledge graph (relationships)
/// with the relational store (enrichment). Each method imposes its own
/// `LIMIT` and never throws on an empty graph side — an empty KG result
/// short-circuits to an empty Vec without touching RS. Every query retries
/// once on a transient store error and honours cooperative cancellation via
/// `cancellation_token()`.
pub struct HybridQueries {
    kg: KgClient,
    rs: RsClient,
    cancel: CancellationToken,
}

impl HybridQueries {
    pub fn new(kg: KgClient, rs: RsClient) -> Self {
        Self {
            kg,
            rs,
            cancel: CancellationToken::new(),
        }
    }

    /// A clone of the token that guards every query issued through this
    /// instance. Cancel it (e.g. when the agent's overall deadline expires)
    /// to abort in-flight and future queries with `StoreError::Cancelled`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn get_incident_history_for(
        &self,
        paths: &[String],
        days_back: u32,
        deadline: Duration,
    ) -> Result<Vec<Incident>> {
        with_deadline_retry(deadline, &self.cancel, || async {
            let links = self.kg.incident_links(paths, days_back.clamp(1, 365)).await?;
            if links.is_empty() {
                return Ok(Vec::new());
            }
            let issue_numbers: Vec<i64> = links.iter().map(|l| l.issue_number).collect();
            let issue_rows = self.rs.issue_bodies(&issue_numbers).await?;
            let by_number: HashMap<i64, _> = issue_rows.into_iter().map(|r| (r.number, r)).collect();

            let mut incidents: Vec<Incident> = links
                .into_iter()
                .filter_map(|link| {
                    let issue = by_number.get(&link.issue_number)?;
                    Some(Incident {
                        issue_number: link.issue_number as u64,
                        pr_number: link.pr_number.map(|n| n as u64),
                        commit_sha: link.commit_sha,
                        link_type: link.link_type,
                        confidence: link.confidence,
                        detection_method: link.detection_method,
                        evidence: Vec::new(),
                        issue_title: issue.title.clone(),
                        issue_body: issue.body.clone(),
                        labels: issue.labels.clone(),
                        created_at: issue.created_at,
                        closed_at: issue.closed_at,
                        author_login: issue.author_login.clone(),
                        author_role: issue.author_association.clone(),
                    })
                })
                .collect();

            incidents.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });
            incidents.truncate(50);
            Ok(incidents)
        })
        .await
    }

    pub async fn get_ownership_history_for(
        &self,
        paths: &[String],
        deadline: Duration,
    ) -> Result<Vec<OwnerEntry>> {
        with_deadline_retry(deadline, &self.cancel, || async {
            let rows = self.kg.ownership_rows(paths).await?;
            if rows.is_empty() {
                return Ok(Vec::new());
            }
            let emails: Vec<String> = rows.iter().map(|r| r.email.clone()).collect();
            let roles = self.rs.contributor_roles(&emails).await?;
            let role_by_email: HashMap<String, Option<String>> = roles
                .into_iter()
                .map(|r| (r.email, r.author_association))
                .collect();

            let now = chrono::Utc::now();
            let mut owners: Vec<OwnerEntry> = rows
                .into_iter()
                .map(|row| {
                    let last_commit = row.last_commit.to_utc();
                    let days_since_commit = (now - last_commit).num_days();
                    OwnerEntry {
                        email: row.email.clone(),
                        commit_count: row.commit_count as u32,
                        last_commit,
                        is_active: days_since_commit <= 90,
                        days_since_commit,
                        author_association: role_by_email.get(&row.email).cloned().flatten(),
                    }
                })
                .collect();

            owners.sort_by(|a, b| {
                b.commit_count
                    .cmp(&a.commit_count)
                    .then_with(|| b.last_commit.cmp(&a.last_commit))
                    .then_with(|| a.email.cmp(&b.email))
            });
            owners.truncate(10);
            Ok(owners)
        })
        .await
    }

    pub async fn get_cochange_partners_with_context(
        &self,
        paths: &[String],
        threshold: f64,
        window_days: u32,
        deadline: Duration,
    ) -> Result<Vec<coderisk_core::CoChangePartner>> {
        with_deadline_retry(deadline, &self.cancel, || async {
            let threshold = threshold.clamp(0.0, 1.0);
            let rows = self.kg.cochange_candidates(paths, window_days).await?;
            if rows.is_empty() {
                return Ok(Vec::new());
            }

            let all_shas: Vec<String> = rows
                .iter()
                .flat_map(|r| r.example_commit_shas.iter().take(3).cloned())
                .collect();
            let enrichment = self.rs.commits_by_sha(&all_shas).await?;
            let message_by_sha: HashMap<String, String> = enrichment
                .into_iter()
                .map(|r| (r.sha, r.message))
                .collect();

            let mut partners: Vec<coderisk_core::CoChangePartner> = rows
                .into_iter()
                .map(|row| {
                    let denom = row.total_commits_a.max(row.total_commits_b).max(1) as f64;
                    let frequency = row.co_changes as f64 / denom;
                    let example_messages = row
                        .example_commit_shas
                        .iter()
                        .take(3)
                        .filter_map(|sha| message_by_sha.get(sha).cloned())
                        .collect();
                    coderisk_core::CoChangePartner {
                        partner_path: row.partner_path,
                        frequency,
                        co_changes: row.co_changes as u32,
                        example_messages,
                    }
                })
                .filter(|p| p.frequency >= threshold)
                .collect();

            partners.sort_by(|a, b| {
                b.frequency
                    .partial_cmp(&a.frequency)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.co_changes.cmp(&a.co_changes))
                    .then_with(|| a.partner_path.cmp(&b.partner_path))
            });
            partners.truncate(10);
            Ok(partners)
        })
        .await
    }

    /// Distinct incoming + outgoing `DEPENDS_ON`/`IMPORTS` neighbours at one
    /// hop, bounded by `limit`.
    pub async fn get_structural_coupling(
        &self,
        paths: &[String],
        limit: u32,
        deadline: Duration,
    ) -> Result<CouplingMetric> {
        with_deadline_retry(deadline, &self.cancel, || async {
            let outgoing = self.kg.dependency_neighbours_outgoing(paths, limit).await?;
            let incoming = self.kg.dependency_neighbours_incoming(paths, limit).await?;
            Ok(CouplingMetric {
                incoming: incoming.len() as u32,
                outgoing: outgoing.len() as u32,
            })
        })
        .await
    }

    /// `tests_touching(f) / max(1, direct_users(f))`: among the files that
    /// directly depend on `paths` (one-hop incoming neighbours), the
    /// fraction that are themselves test files.
    pub async fn get_test_ratio(
        &self,
        paths: &[String],
        limit: u32,
        deadline: Duration,
    ) -> Result<TestRatioMetric> {
        with_deadline_retry(deadline, &self.cancel, || async {
            let users = self.kg.dependency_neighbours_incoming(paths, limit).await?;
            let direct_users = users.len() as u32;
            let tests_touching = users.iter().filter(|p| is_test_path(p)).count() as u32;
            let ratio = tests_touching as f64 / direct_users.max(1) as f64;
            Ok(TestRatioMetric {
                tests_touching,
                direct_users,
                ratio,
            })
        })
        .await
    }

    pub async fn get_blast_radius_with_incidents(
        &self,
        path: &str,
        deadline: Duration,
    ) -> Result<Vec<BlastRadiusEntry>> {
        with_deadline_retry(deadline, &self.cancel, || async {
            let dependents = self
                .kg
                .dependency_neighbours_incoming(&[path.to_string()], 20)
                .await?;
            if dependents.is_empty() {
                return Ok(Vec::new());
            }
            let mut out = Vec::with_capacity(dependents.len());
            for dependent in dependents.into_iter().take(20) {
                let links = self
                    .kg
                    .incident_links(std::slice::from_ref(&dependent), 180)
                    .await?;
                out.push(BlastRadiusEntry {
                    path: dependent,
                    incident_count_180d: links.len() as u32,
                });
            }
            Ok(out)
        })
        .await
    }

    pub async fn get_commit_patch(
        &self,
        sha: &str,
        deadline: Duration,
    ) -> Result<Option<String>> {
        with_deadline_retry(deadline, &self.cancel, || async {
            Ok(self.rs.commit_patch(sha).await?.and_then(|row| row.patch))
        })
        .await
    }

    pub async fn get_recent_commits(
        &self,
        paths: &[String],
        limit: u32,
        deadline: Duration,
    ) -> Result<Vec<CommitSummary>> {
        with_deadline_retry(deadline, &self.cancel, || async {
            let rows = self.kg.commits_touching(paths, limit.clamp(1, 50)).await?;
            if rows.is_empty() {
                return Ok(Vec::new());
            }
            let shas: Vec<String> = rows.iter().map(|r| r.sha.clone()).collect();
            let enrichment = self.rs.commits_by_sha(&shas).await?;
            let by_sha: HashMap<String, _> =
                enrichment.into_iter().map(|r| (r.sha.clone(), r)).collect();

            Ok(rows
                .into_iter()
                .filter_map(|row| {
                    let enriched = by_sha.get(&row.sha)?;
                    Some(CommitSummary {
                        sha: row.sha,
                        message: enriched.message.clone(),
                        author_email: enriched.author_email.clone(),
                        committed_at: row.committed_at.to_utc(),
                    })
                })
                .collect())
        })
        .await
    }
}

/// Language-agnostic test-file heuristic shared by the test-ratio query:
/// directory markers and filename suffix/prefix conventions across the
/// languages the KG ingests (Go, Python, JS/TS, Rust, Java, Ruby).
const TEST_DIR_MARKERS: &[&str] = &["/test/", "/tests/", "__tests__/", "/spec/"];
const TEST_FILE_MARKERS: &[&str] = &[
    "_test.", "test_", ".test.", ".spec.", "_spec.", "spec_",
];

fn is_test_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    TEST_DIR_MARKERS.iter().any(|m| lower.contains(m))
        || TEST_FILE_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_test_path_matches_directory_and_suffix_conventions() {
        assert!(is_test_path("src/auth/login_test.go"));
        assert!(is_test_path("tests/unit/helpers.py"));
        assert!(is_test_path("__tests__/login.spec.ts"));
        assert!(!is_test_path("src/auth/login.go"));
    }
}
