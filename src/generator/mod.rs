pub mod pg_dump;
pub use pg_dump::PgDumpGenerator;

use async_trait::async_trait;

use crate::cache::{ArtifactStore, CacheEntry, CacheResult};

/// Produces a new artifact in the store on demand.
///
/// Implementations must leave nothing under an artifact name unless they
/// return `Ok`.
#[async_trait]
pub trait DumpGenerator: Send + Sync + 'static {
    async fn generate(&self, store: &ArtifactStore) -> CacheResult<CacheEntry>;
}
