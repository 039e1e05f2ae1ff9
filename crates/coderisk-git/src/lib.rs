//! File-identity resolution over git history: mapping a current working-tree
//! path to every historical name the knowledge graph has observed for it.

pub mod changeset;
pub mod errors;
pub mod history;
pub mod repo;
pub mod resolver;
pub mod types;

pub use errors::{GitIntegrationError, Result};
pub use repo::GitRepository;
pub use resolver::{FileResolver, KgPathLookup};
pub use types::{CommitRecord, FileChange, FileMatch, ResolveMethod};
