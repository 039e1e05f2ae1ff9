use crate::errors::{GitIntegrationError, Result};
use git2::{Repository, RepositoryOpenFlags};
use std::path::{Path, PathBuf};

/// Thin wrapper over a `git2::Repository` opened at a workdir root.
pub struct GitRepository {
    path: PathBuf,
    repo: Repository,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let repo = Repository::open_ext(
            path_ref,
            RepositoryOpenFlags::empty(),
            &[] as &[&std::ffi::OsStr],
        )
        .map_err(|_| GitIntegrationError::RepoNotFound(path_ref.display().to_string()))?;
        Ok(Self {
            path: path_ref.to_path_buf(),
            repo,
        })
    }

    pub fn init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::init(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            repo,
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    pub fn root(&self) -> &Path {
        &self.path
    }

    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(head.shorthand().map(|s| s.to_string()))
    }
}
