use crate::errors::Result;
use crate::repo::GitRepository;
use crate::types::{FileMatch, ResolveMethod};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Read-only view of the knowledge graph's `File` nodes, implemented by the
/// store crate. Kept as a trait here so the resolver never depends on a
/// concrete graph client.
#[async_trait]
pub trait KgPathLookup: Send + Sync {
    async fn path_exists(&self, repo_id: &str, path: &str) -> coderisk_core::Result<bool>;

    /// Filters `candidates` down to those present as a `File.path` in the
    /// graph, preserving order.
    async fn existing_paths(
        &self,
        repo_id: &str,
        candidates: &[String],
    ) -> coderisk_core::Result<Vec<String>>;
}

/// Resolves a current working-tree path to the set of historical paths the
/// same file has been known by in the knowledge graph.
pub struct FileResolver<K> {
    repo: GitRepository,
    kg: Arc<K>,
    max_workers: usize,
}

impl<K: KgPathLookup + 'static> FileResolver<K> {
    pub fn new(repo: GitRepository, kg: Arc<K>) -> Self {
        let max_workers = num_cpus::get().max(1);
        Self {
            repo,
            kg,
            max_workers,
        }
    }

    /// Exact match first (confidence 1.0), then rename-chain discovery
    /// filtered to names the graph has actually observed (confidence 0.95).
    /// Short-circuits after the exact match since a hit there is already
    /// sound and further history walking would only add redundant matches.
    pub async fn resolve(&self, repo_id: &str, current_path: &str) -> Result<Vec<FileMatch>> {
        if self.kg.path_exists(repo_id, current_path).await? {
            return Ok(vec![FileMatch {
                historical_path: current_path.to_string(),
                confidence: 1.0,
                method: ResolveMethod::Exact,
            }]);
        }

        let chain = self.repo.rename_chain(current_path)?;
        if chain.is_empty() {
            return Ok(Vec::new());
        }
        let known = self.kg.existing_paths(repo_id, &chain).await?;
        Ok(known
            .into_iter()
            .map(|historical_path| FileMatch {
                historical_path,
                confidence: 0.95,
                method: ResolveMethod::GitFollow,
            })
            .collect())
    }

    /// Resolves every path in `paths`, bounded to `max_workers` concurrent
    /// resolutions since each call is dominated by I/O (graph round-trips,
    /// git tree walks) rather than CPU. `git2::Repository` is not `Send`, so
    /// each worker reopens the repository from its root path rather than
    /// sharing the handle held by `self`.
    pub async fn batch_resolve(
        &self,
        repo_id: &str,
        paths: &[String],
    ) -> Result<HashMap<String, Vec<FileMatch>>> {
        use tokio::sync::Semaphore;

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let repo_root: PathBuf = self.repo.root().to_path_buf();
        let mut set = tokio::task::JoinSet::new();

        for path in paths {
            let permit = Arc::clone(&semaphore);
            let path = path.clone();
            let repo_id = repo_id.to_string();
            let repo_root = repo_root.clone();
            let kg = Arc::clone(&self.kg);
            set.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore open");
                let matches = resolve_one(repo_root, kg.as_ref(), &repo_id, &path).await;
                (path, matches)
            });
        }

        let mut out = HashMap::with_capacity(paths.len());
        while let Some(joined) = set.join_next().await {
            let (path, matches) = joined.map_err(|e| {
                coderisk_core::CoreRiskError::transient("git-resolver-worker", anyhow::anyhow!(e))
            })?;
            out.insert(path, matches?);
        }
        Ok(out)
    }
}

async fn resolve_one<K: KgPathLookup>(
    repo_root: PathBuf,
    kg: &K,
    repo_id: &str,
    current_path: &str,
) -> Result<Vec<FileMatch>> {
    if kg.path_exists(repo_id, current_path).await? {
        return Ok(vec![FileMatch {
            historical_path: current_path.to_string(),
            confidence: 1.0,
            method: ResolveMethod::Exact,
        }]);
    }

    let path_owned = current_path.to_string();
    let chain = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
        let repo = GitRepository::open(&repo_root)?;
        repo.rename_chain(&path_owned)
    })
    .await
    .map_err(|e| coderisk_core::CoreRiskError::transient("git-rename-chain", anyhow::anyhow!(e)))??;

    if chain.is_empty() {
        return Ok(Vec::new());
    }
    let known = kg.existing_paths(repo_id, &chain).await?;
    Ok(known
        .into_iter()
        .map(|historical_path| FileMatch {
            historical_path,
            confidence: 0.95,
            method: ResolveMethod::GitFollow,
        })
        .collect())
}
