use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use secrecy::{ExposeSecret, SecretString};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::DumpGenerator;
use crate::cache::{ArtifactStore, CacheEntry, CacheError, CacheResult};
use crate::config::constants::{
    DEFAULT_PG_DUMP_PROGRAM, GENERATOR_READ_CHUNK_BYTES, MAX_GENERATOR_STDERR_BYTES,
};

const PG_DUMP_ARGS: [&str; 3] = ["--format=tar", "--no-owner", "--no-privileges"];

/// Runs `pg_dump` against one database and stores its tar output gzipped.
#[derive(Debug)]
pub struct PgDumpGenerator {
    program: PathBuf,
    database_url: SecretString,
}

impl PgDumpGenerator {
    pub fn new(database_url: SecretString) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PG_DUMP_PROGRAM),
            database_url,
        }
    }

    /// Use a `pg_dump` binary other than the one on `PATH`. The arguments
    /// passed to it stay fixed.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(PG_DUMP_ARGS)
            .arg(format!("--dbname={}", self.database_url.expose_secret()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Spawn `pg_dump`, gzip its stdout into `partial` and wait for it.
    /// Returns the compressed size.
    async fn dump_to_file(&self, program: &str, partial: &Path) -> CacheResult<u64> {
        let mut file = File::create(partial)
            .await
            .map_err(|e| CacheError::store_io(partial, e))?;
        let mut child = self
            .command()
            .spawn()
            .map_err(|e| CacheError::spawn(program, e))?;

        let stderr_reader = child.stderr.take().map(collect_stderr);

        let written = match child.stdout.take() {
            // stdout is dropped when this returns so a stalled child sees a closed pipe
            Some(stdout) => compress_into(stdout, &mut file).await,
            None => Err(io::Error::other("generator stdout was not captured")),
        };

        let status = child
            .wait()
            .await
            .map_err(|e| CacheError::spawn(program, e))?;
        let stderr = match stderr_reader {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                tracing::warn!("Generator stderr reader failed: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let bytes = written.map_err(|e| CacheError::store_io(partial, e))?;
        if !status.success() {
            return Err(CacheError::Generation {
                status: status.to_string(),
                stderr: summarize_stderr(&stderr),
            });
        }

        Ok(bytes)
    }
}

#[async_trait]
impl DumpGenerator for PgDumpGenerator {
    #[tracing::instrument(skip_all, level = "info", name = "PgDump")]
    async fn generate(&self, store: &ArtifactStore) -> CacheResult<CacheEntry> {
        store.ensure_dir().await?;

        let created_at = ArtifactStore::timestamp_now();
        let partial = store.partial_path(created_at);
        let target = store.artifact_path(created_at);

        let program = self.program.display().to_string();
        tracing::info!("Starting {} into {}", program, partial.display());
        let started = Instant::now();

        let bytes = match self.dump_to_file(&program, &partial).await {
            Ok(bytes) => bytes,
            Err(e) => {
                discard_partial(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            discard_partial(&partial).await;
            return Err(CacheError::store_io(&target, e));
        }

        tracing::info!(
            "Dump written to {} ({} bytes compressed) in {:.1}s",
            target.display(),
            bytes,
            started.elapsed().as_secs_f64()
        );

        Ok(CacheEntry::new(target, created_at))
    }
}

/// Drain the child's stderr on its own task so a chatty `pg_dump` never
/// blocks on a full pipe while stdout is being copied.
fn collect_stderr<R>(mut stderr: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Err(e) = stderr.read_to_end(&mut buffer).await {
            tracing::warn!("Failed to read generator stderr: {}", e);
        }
        buffer
    })
}

/// Gzip everything read from `source` into `file`, then flush and sync it.
/// Returns the size of the file.
async fn compress_into<R>(mut source: R, file: &mut File) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut chunk = vec![0u8; GENERATOR_READ_CHUNK_BYTES];

    loop {
        let read = source.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        encoder.write_all(&chunk[..read])?;

        let compressed = encoder.get_mut();
        if !compressed.is_empty() {
            file.write_all(compressed.as_slice()).await?;
            compressed.clear();
        }
    }

    let tail = encoder.finish()?;
    file.write_all(&tail).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(file.metadata().await?.len())
}

async fn discard_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial dump {}: {}", partial.display(), e),
    }
}

fn summarize_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_GENERATOR_STDERR_BYTES {
        return text.to_string();
    }

    let mut end = MAX_GENERATOR_STDERR_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
