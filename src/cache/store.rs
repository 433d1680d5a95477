//! Directory of generated dumps.
//!
//! Artifacts are named `dump-<epoch-millis>.tar.gz`, so the creation instant
//! can be recovered from the file name alone after a restart. Generation
//! writes to a hidden `.dump-<epoch-millis>.tar.gz.partial` file first and
//! renames it once complete; partial files are never listed as artifacts.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::entry::CacheEntry;
use super::error::{CacheError, CacheResult};

pub const ARTIFACT_PREFIX: &str = "dump-";
pub const ARTIFACT_SUFFIX: &str = ".tar.gz";
pub const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> CacheResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheError::store_io(&self.dir, e))
    }

    /// Current instant truncated to the millisecond precision of file names,
    /// so an entry built in memory equals the one recovered from disk.
    pub fn timestamp_now() -> DateTime<Utc> {
        let now = Utc::now();
        DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
    }

    pub fn artifact_path(&self, created_at: DateTime<Utc>) -> PathBuf {
        self.dir.join(artifact_name(created_at))
    }

    pub fn partial_path(&self, created_at: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!(".{}{}", artifact_name(created_at), PARTIAL_SUFFIX))
    }

    /// All artifacts, newest first. Ties on the instant fall back to the file
    /// name so the order is deterministic. A missing directory is an empty store.
    pub async fn list(&self) -> CacheResult<Vec<CacheEntry>> {
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::store_io(&self.dir, e)),
        };

        let mut entries = Vec::new();
        while let Some(dir_entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| CacheError::store_io(&self.dir, e))?
        {
            let file_type = match dir_entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::debug!("Skipping {:?}: {}", dir_entry.path(), e);
                    continue;
                }
            };
            if !file_type.is_file() {
                continue;
            }

            let name = dir_entry.file_name();
            if let Some(created_at) = name.to_str().and_then(parse_artifact_name) {
                entries.push(CacheEntry::new(dir_entry.path(), created_at));
            }
        }

        sort_newest_first(&mut entries);
        Ok(entries)
    }

    pub async fn latest(&self) -> CacheResult<Option<CacheEntry>> {
        Ok(self.list().await?.into_iter().next())
    }

    pub async fn remove(&self, path: &Path) -> CacheResult<()> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| CacheError::store_io(path, e))
    }

    /// Delete partial files left behind by an interrupted generation.
    /// Returns how many were removed.
    pub async fn clean_partials(&self) -> CacheResult<usize> {
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::store_io(&self.dir, e)),
        };

        let mut removed = 0;
        while let Some(dir_entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| CacheError::store_io(&self.dir, e))?
        {
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_partial_name(name) {
                continue;
            }

            match tokio::fs::remove_file(dir_entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove partial dump {}: {}", name, e),
            }
        }

        Ok(removed)
    }
}

pub fn artifact_name(created_at: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        ARTIFACT_PREFIX,
        created_at.timestamp_millis(),
        ARTIFACT_SUFFIX
    )
}

/// Creation instant encoded in an artifact file name, if the name is one.
pub fn parse_artifact_name(name: &str) -> Option<DateTime<Utc>> {
    let millis = name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?;
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    DateTime::from_timestamp_millis(millis.parse().ok()?)
}

fn is_partial_name(name: &str) -> bool {
    name.strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(PARTIAL_SUFFIX))
        .and_then(parse_artifact_name)
        .is_some()
}

fn sort_newest_first(entries: &mut [CacheEntry]) {
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.path.file_name().cmp(&a.path.file_name()))
    });
}
