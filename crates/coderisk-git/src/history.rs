use crate::errors::Result;
use crate::repo::GitRepository;
use crate::types::{CommitRecord, FileChange};
use git2::{DiffFindOptions, DiffOptions, Sort};

impl GitRepository {
    /// Walks first-parent history from HEAD, yielding one `CommitRecord` per
    /// commit up to `max_commits`. Binary deltas are skipped rather than
    /// recorded with synthetic add/delete counts.
    pub fn commit_log(&self, max_commits: usize) -> Result<Vec<CommitRecord>> {
        let repo = self.repository();
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;

        let mut out = Vec::new();
        for oid_res in revwalk.take(max_commits) {
            let oid = oid_res?;
            let commit = repo.find_commit(oid)?;
            let sig = commit.author();
            let files_changed = if commit.parent_count() == 0 {
                Vec::new()
            } else {
                let parent = commit.parent(0)?;
                self.diff_files(&parent.tree()?, &commit.tree()?)?
            };
            out.push(CommitRecord {
                sha: oid.to_string(),
                author_name: sig.name().unwrap_or("unknown").to_string(),
                author_email: sig.email().unwrap_or("").to_string(),
                timestamp: chrono::DateTime::from_timestamp(commit.time().seconds(), 0)
                    .unwrap_or_default(),
                message: commit.message().unwrap_or("").to_string(),
                files_changed,
            });
        }
        Ok(out)
    }

    fn diff_files(
        &self,
        old_tree: &git2::Tree<'_>,
        new_tree: &git2::Tree<'_>,
    ) -> Result<Vec<FileChange>> {
        let repo = self.repository();
        let mut diffopts = DiffOptions::new();
        let diff = repo.diff_tree_to_tree(Some(old_tree), Some(new_tree), Some(&mut diffopts))?;
        let mut changes = Vec::new();
        for idx in 0..diff.deltas().len() {
            let patch = match git2::Patch::from_diff(&diff, idx)? {
                Some(p) => p,
                None => continue,
            };
            let delta = patch.delta();
            if delta.new_file().is_binary() || delta.old_file().is_binary() {
                continue;
            }
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .and_then(|p| p.to_str())
                .map(str::to_string);
            let Some(path) = path else { continue };
            let (additions, deletions) = patch.line_stats().map(|(_, a, d)| (a, d)).unwrap_or((0, 0));
            changes.push(FileChange {
                path,
                additions: additions as u32,
                deletions: deletions as u32,
            });
        }
        Ok(changes)
    }

    /// Discovers the chain of historical names for `start_path`, walking
    /// first-parent history and following rename deltas backward. Mirrors
    /// `git log --follow`'s rename-detection heuristics, oldest name last.
    pub fn rename_chain(&self, start_path: &str) -> Result<Vec<String>> {
        let repo = self.repository();
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;

        let mut chain = Vec::new();
        let mut tracking = start_path.to_string();

        for oid_res in revwalk {
            let oid = oid_res?;
            let commit = repo.find_commit(oid)?;
            if commit.parent_count() == 0 {
                break;
            }
            let parent = commit.parent(0)?;
            let mut diffopts = DiffOptions::new();
            let mut diff = repo.diff_tree_to_tree(
                Some(&parent.tree()?),
                Some(&commit.tree()?),
                Some(&mut diffopts),
            )?;
            let mut findopts = DiffFindOptions::new();
            findopts.renames(true);
            diff.find_similar(Some(&mut findopts))?;

            for idx in 0..diff.deltas().len() {
                let delta = diff.get_delta(idx).expect("index in range");
                if !delta.status().eq(&git2::Delta::Renamed) {
                    continue;
                }
                let new_path = delta.new_file().path().and_then(|p| p.to_str());
                let old_path = delta.old_file().path().and_then(|p| p.to_str());
                if new_path == Some(tracking.as_str()) {
                    if let Some(old_path) = old_path {
                        chain.push(old_path.to_string());
                        tracking = old_path.to_string();
                    }
                }
            }
        }
        Ok(chain)
    }
}
