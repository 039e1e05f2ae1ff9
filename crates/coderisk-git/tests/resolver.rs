use async_trait::async_trait;
use coderisk_git::{FileResolver, GitRepository, KgPathLookup, ResolveMethod};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn write_file<P: AsRef<std::path::Path>>(p: P, content: &str) {
    fs::create_dir_all(p.as_ref().parent().unwrap()).unwrap();
    fs::write(p, content).unwrap();
}

fn commit_all(repo: &GitRepository, message: &str, parent_of_head: bool) {
    let sig = git2::Signature::now("Tester", "tester@example.com").unwrap();
    let mut index = repo.repository().index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.repository().find_tree(tree_id).unwrap();
    let parents: Vec<git2::Commit> = if parent_of_head {
        vec![repo.repository().head().unwrap().peel_to_commit().unwrap()]
    } else {
        vec![]
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    repo.repository()
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap();
}

struct FakeKg {
    known: HashSet<String>,
}

#[async_trait]
impl KgPathLookup for FakeKg {
    async fn path_exists(&self, _repo_id: &str, path: &str) -> coderisk_core::Result<bool> {
        Ok(self.known.contains(path))
    }

    async fn existing_paths(
        &self,
        _repo_id: &str,
        candidates: &[String],
    ) -> coderisk_core::Result<Vec<String>> {
        Ok(candidates
            .iter()
            .filter(|c| self.known.contains(*c))
            .cloned()
            .collect())
    }
}

#[tokio::test]
async fn resolve_returns_exact_match_when_kg_already_knows_current_path() {
    let dir = tempdir().unwrap();
    let repo = GitRepository::init(dir.path()).unwrap();
    write_file(dir.path().join("a.txt"), "hello");
    commit_all(&repo, "init", false);

    let kg = Arc::new(FakeKg {
        known: HashSet::from(["a.txt".to_string()]),
    });
    let resolver = FileResolver::new(GitRepository::open(dir.path()).unwrap(), kg);
    let matches = resolver.resolve("repo1", "a.txt").await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].confidence, 1.0);
    assert_eq!(matches[0].method, ResolveMethod::Exact);
}

#[tokio::test]
async fn resolve_follows_rename_chain_when_current_path_is_unknown() {
    let dir = tempdir().unwrap();
    let repo = GitRepository::init(dir.path()).unwrap();
    write_file(dir.path().join("old_name.rs"), "fn a() {}");
    commit_all(&repo, "init", false);

    fs::rename(
        dir.path().join("old_name.rs"),
        dir.path().join("new_name.rs"),
    )
    .unwrap();
    commit_all(&repo, "rename", true);

    let kg = Arc::new(FakeKg {
        known: HashSet::from(["old_name.rs".to_string()]),
    });
    let resolver = FileResolver::new(GitRepository::open(dir.path()).unwrap(), kg);
    let matches = resolver.resolve("repo1", "new_name.rs").await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].historical_path, "old_name.rs");
    assert_eq!(matches[0].confidence, 0.95);
    assert_eq!(matches[0].method, ResolveMethod::GitFollow);
}

#[tokio::test]
async fn resolve_returns_empty_when_path_has_no_graph_presence() {
    let dir = tempdir().unwrap();
    let repo = GitRepository::init(dir.path()).unwrap();
    write_file(dir.path().join("a.txt"), "hello");
    commit_all(&repo, "init", false);

    let kg = Arc::new(FakeKg {
        known: HashSet::new(),
    });
    let resolver = FileResolver::new(GitRepository::open(dir.path()).unwrap(), kg);
    let matches = resolver.resolve("repo1", "a.txt").await.unwrap();

    assert!(matches.is_empty());
}

#[tokio::test]
async fn batch_resolve_resolves_every_requested_path() {
    let dir = tempdir().unwrap();
    let repo = GitRepository::init(dir.path()).unwrap();
    write_file(dir.path().join("a.txt"), "hello");
    write_file(dir.path().join("b.txt"), "world");
    commit_all(&repo, "init", false);

    let kg = Arc::new(FakeKg {
        known: HashSet::from(["a.txt".to_string(), "b.txt".to_string()]),
    });
    let resolver = FileResolver::new(GitRepository::open(dir.path()).unwrap(), kg);
    let paths = vec!["a.txt".to_string(), "b.txt".to_string()];
    let resolved = resolver.batch_resolve("repo1", &paths).await.unwrap();

    assert_eq!(resolved.len(), 2);
    assert!(resolved["a.txt"][0].confidence == 1.0);
    assert!(resolved["b.txt"][0].confidence == 1.0);
}
