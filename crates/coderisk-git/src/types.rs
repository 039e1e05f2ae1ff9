use serde::{Deserialize, Serialize};

/// How a historical path was discovered for a given current path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMethod {
    Exact,
    GitFollow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMatch {
    pub historical_path: String,
    pub confidence: f64,
    pub method: ResolveMethod,
}

/// A raw commit record read off the git history, used for both file
/// resolution and as an input to Phase 1's ownership/co-change queries
/// when the KG has not yet observed a commit.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub message: String,
    pub files_changed: Vec<FileChange>,
}

/// A single file touched by a commit. Binary-file deltas (additions/deletions
/// reported as `-`/`-` by `git log --numstat`) are never materialized here;
/// such entries are dropped while walking the diff.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: String,
    pub additions: u32,
    pub deletions: u32,
}
