use crate::errors::Result;
use crate::repo::GitRepository;
use git2::{DiffOptions, StatusOptions};

impl GitRepository {
    /// The working-tree changeset: every path with a staged or unstaged
    /// modification, plus untracked files, deduplicated and sorted. This is
    /// the default input set for `check` when the caller passes no explicit
    /// paths (spec.md §6: "defaulting to git's staged+unstaged set").
    pub fn working_tree_changeset(&self) -> Result<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = self.repository().statuses(Some(&mut opts))?;

        let mut paths: Vec<String> = statuses
            .iter()
            .filter(|entry| !entry.status().is_ignored())
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// A unified diff for one path, staged changes first, falling back to
    /// the unstaged working-tree diff if the path carries no staged hunk.
    /// Used to feed Phase 0's comment-only-diff detector and the agent's
    /// diff-digest prompt input. Returns an empty string for an untracked
    /// file with no prior blob to diff against.
    pub fn unified_diff_for(&self, path: &str) -> Result<String> {
        let repo = self.repository();
        let mut opts = DiffOptions::new();
        opts.pathspec(path);

        let head_tree = repo.head().ok().and_then(|h| h.peel_to_tree().ok());
        let staged = repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))?;
        if staged.deltas().len() > 0 {
            return render_diff(&staged);
        }

        let mut opts = DiffOptions::new();
        opts.pathspec(path);
        let unstaged = repo.diff_index_to_workdir(None, Some(&mut opts))?;
        render_diff(&unstaged)
    }
}

fn render_diff(diff: &git2::Diff<'_>) -> Result<String> {
    let mut out = String::new();
    diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => out.push(line.origin()),
            _ => {}
        }
        out.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn init_repo_with_commit() -> (tempfile::TempDir, GitRepository) {
        let dir = tempdir().unwrap();
        let repo = GitRepository::init(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        let git = repo.repository();
        let mut index = git.index().unwrap();
        index.add_path(std::path::Path::new("a.txt")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = git.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        git.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        (dir, repo)
    }

    #[test]
    fn changeset_includes_untracked_files() {
        let (dir, repo) = init_repo_with_commit();
        fs::write(dir.path().join("b.txt"), "new file\n").unwrap();
        let changeset = repo.working_tree_changeset().unwrap();
        assert!(changeset.contains(&"b.txt".to_string()));
    }

    #[test]
    fn changeset_includes_unstaged_modifications() {
        let (dir, repo) = init_repo_with_commit();
        fs::write(dir.path().join("a.txt"), "changed\n").unwrap();
        let changeset = repo.working_tree_changeset().unwrap();
        assert!(changeset.contains(&"a.txt".to_string()));
    }

    #[test]
    fn unified_diff_reports_the_unstaged_change() {
        let (dir, repo) = init_repo_with_commit();
        fs::write(dir.path().join("a.txt"), "hello\nworld\n").unwrap();
        let diff = repo.unified_diff_for("a.txt").unwrap();
        assert!(diff.contains("+world"));
    }
}
