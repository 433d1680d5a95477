use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use super::entry::CacheEntry;
use super::store::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub keep_count: NonZeroUsize,
}

impl RetentionPolicy {
    pub fn new(keep_count: NonZeroUsize) -> Self {
        Self { keep_count }
    }
}

/// Outcome of one pruning pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Keep the `keep_count` newest artifacts and delete the rest.
///
/// Best effort: listing and deletion failures are logged, never returned.
/// `protect` is never deleted even when it falls outside the keep window.
#[tracing::instrument(skip(store), level = "debug", name = "Prune")]
pub async fn prune(
    store: &ArtifactStore,
    policy: RetentionPolicy,
    protect: Option<&Path>,
) -> PruneReport {
    let entries = match store.list().await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Skipping retention pass, cannot list dumps: {}", e);
            return PruneReport::default();
        }
    };

    apply(store, entries, policy, protect).await
}

/// Retention over an already listed, newest-first set of entries. A failed
/// deletion is recorded and the pass moves on to the next entry.
async fn apply(
    store: &ArtifactStore,
    entries: Vec<CacheEntry>,
    policy: RetentionPolicy,
    protect: Option<&Path>,
) -> PruneReport {
    let mut report = PruneReport::default();

    let keep = policy.keep_count.get();
    for (index, entry) in entries.into_iter().enumerate() {
        let protected = protect.is_some_and(|path| path == entry.path());
        if index < keep || protected {
            report.kept.push(entry.path);
            continue;
        }

        match store.remove(entry.path()).await {
            Ok(()) => {
                tracing::info!("Removed old dump {}", entry.file_name());
                report.removed.push(entry.path);
            }
            Err(e) => {
                tracing::warn!("Failed to remove old dump: {}", e);
                report.failed.push(entry.path);
            }
        }
    }

    tracing::debug!(
        "Retention kept {} dumps, removed {}, failed {}",
        report.kept.len(),
        report.removed.len(),
        report.failed.len()
    );

    report
}
