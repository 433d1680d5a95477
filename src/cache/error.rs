use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Everything that can go wrong between a request and a served dump.
///
/// The type is `Clone` so a single refresh outcome can be handed to every
/// caller waiting on it; I/O sources are kept behind an `Arc` for that reason.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("dump generator exited with {status}: {stderr}")]
    Generation { status: String, stderr: String },

    #[error("failed to launch dump generator `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("artifact store I/O failed at {}: {source}", .path.display())]
    StoreIo {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("No cache available yet")]
    NotAvailable,

    #[error("Cache file missing")]
    MissingFile { path: PathBuf },

    #[error("Refresh already in progress")]
    RefreshBusy,

    #[error("refresh task ended unexpectedly: {0}")]
    Aborted(String),
}

impl CacheError {
    pub fn store_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        CacheError::StoreIo {
            path: path.as_ref().to_path_buf(),
            source: Arc::new(source),
        }
    }

    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        CacheError::Spawn {
            program: program.into(),
            source: Arc::new(source),
        }
    }

    /// Whether a client should simply try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CacheError::NotAvailable | CacheError::MissingFile { .. } | CacheError::RefreshBusy
        )
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(CacheError::NotAvailable.is_retryable());
        assert!(CacheError::RefreshBusy.is_retryable());
        assert!(
            CacheError::MissingFile {
                path: PathBuf::from("dump-1.tar.gz")
            }
            .is_retryable()
        );
        assert!(
            !CacheError::Generation {
                status: "exit status: 1".into(),
                stderr: "connection refused".into(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn store_io_message_names_path() {
        let err = CacheError::store_io(
            "/tmp/dumps",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/dumps"));
        assert!(err.to_string().contains("denied"));
    }
}
