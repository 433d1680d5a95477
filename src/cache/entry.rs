use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// One generated dump on disk. Never mutated after creation; a refresh
/// publishes a new entry instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(path: impl Into<PathBuf>, created_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            created_at,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Age relative to `now`, clamped at zero for clocks that went backwards.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Stale once strictly older than `ttl`; an age of exactly `ttl` is still fresh.
    pub fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > ttl
    }
}
