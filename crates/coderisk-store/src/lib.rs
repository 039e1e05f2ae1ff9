//! Read-only hybrid query layer over the pre-ingested knowledge graph (KG)
//! and relational store (RS). Every composed query here is a two-phase
//! read: a graph hop for relationships, then a relational batch lookup for
//! enrichment (issue bodies, commit messages, contributor roles).

pub mod errors;
pub mod kg;
pub mod queries;
pub mod retry;
pub mod rs;

pub use errors::{Result, StoreError};
pub use kg::{KgClient, KgConfig};
pub use queries::HybridQueries;
pub use rs::RsClient;

pub use tokio_util::sync::CancellationToken;
