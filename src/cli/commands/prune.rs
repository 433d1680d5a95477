use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::{
    cache::{ArtifactStore, RetentionPolicy, prune},
    cli::types::LogArgs,
    config::constants::{DEFAULT_DUMP_DIR, DEFAULT_KEEP_COUNT},
    logging::configure_global_tracing,
};

#[derive(Parser, Debug)]
#[command(about = "Apply the retention policy to a dump directory once and exit")]
pub struct PruneCommand {
    #[arg(
        short = 'd',
        long,
        env = "DUMP_DIR",
        default_value = DEFAULT_DUMP_DIR,
        help = "Directory where dumps are stored"
    )]
    pub dump_dir: PathBuf,

    #[arg(
        short = 'k',
        long,
        env = "CACHE_KEEP_COUNT",
        default_value_t = DEFAULT_KEEP_COUNT,
        help = "Number of dumps to keep on disk"
    )]
    pub keep: NonZeroUsize,

    #[command(flatten)]
    pub log: LogArgs,
}

impl PruneCommand {
    pub async fn execute(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _log_guard = configure_global_tracing(self.log.to_config())?;

        let store = ArtifactStore::new(&self.dump_dir);
        let partials = store.clean_partials().await?;
        if partials > 0 {
            tracing::info!("Removed {} partial dumps", partials);
        }

        let report = prune(&store, RetentionPolicy::new(self.keep), None).await;
        tracing::info!(
            "Kept {} dumps, removed {}, failed to remove {}",
            report.kept.len(),
            report.removed.len(),
            report.failed.len()
        );

        if !report.failed.is_empty() {
            return Err(format!("{} dumps could not be removed", report.failed.len()).into());
        }

        Ok(())
    }
}
