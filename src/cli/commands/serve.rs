use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::{
    api::start_server,
    cli::types::LogArgs,
    config::{
        ServiceConfig,
        constants::{
            DEFAULT_DUMP_DIR, DEFAULT_HOST, DEFAULT_KEEP_COUNT, DEFAULT_PG_DUMP_PROGRAM,
            DEFAULT_PORT, DEFAULT_TTL_SECS,
        },
    },
    logging::configure_global_tracing,
};

#[derive(Parser, Debug)]
#[command(about = "Serve cached database dumps over HTTP")]
pub struct ServeCommand {
    #[arg(
        long,
        env = "DATABASE_URL",
        hide_env_values = true,
        help = "Connection string of the database to dump"
    )]
    pub database_url: String,

    #[arg(
        long,
        env = "API_TOKEN",
        hide_env_values = true,
        help = "Shared secret clients must send as a bearer token"
    )]
    pub api_token: String,

    #[arg(
        short = 'd',
        long,
        env = "DUMP_DIR",
        default_value = DEFAULT_DUMP_DIR,
        help = "Directory where dumps are stored"
    )]
    pub dump_dir: PathBuf,

    #[arg(
        long,
        env = "CACHE_TTL_SECONDS",
        default_value_t = DEFAULT_TTL_SECS,
        help = "Seconds after which the cached dump is considered stale"
    )]
    pub ttl: u64,

    #[arg(
        short = 'H',
        long,
        env = "HOST",
        default_value = DEFAULT_HOST,
        help = "Host address to bind the HTTP server"
    )]
    pub host: String,

    #[arg(
        short = 'p',
        long,
        env = "PORT",
        default_value_t = DEFAULT_PORT,
        help = "Port number to bind the HTTP server"
    )]
    pub port: u16,

    #[arg(
        short = 'k',
        long,
        env = "CACHE_KEEP_COUNT",
        default_value_t = DEFAULT_KEEP_COUNT,
        help = "Number of dumps to keep on disk"
    )]
    pub keep: NonZeroUsize,

    #[arg(
        long,
        env = "PG_DUMP_PATH",
        default_value = DEFAULT_PG_DUMP_PROGRAM,
        help = "pg_dump executable to run"
    )]
    pub pg_dump: PathBuf,

    #[command(flatten)]
    pub log: LogArgs,
}

impl ServeCommand {
    pub async fn execute(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _log_guard = configure_global_tracing(self.log.to_config())?;

        tracing::info!("Dump cache v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("  → Listen: {}:{}", self.host, self.port);
        tracing::info!("  → Dump directory: {}", self.dump_dir.display());
        tracing::info!("  → TTL: {}s", self.ttl);
        tracing::info!("  → Keep: {} dumps", self.keep);
        tracing::info!("  → pg_dump: {}", self.pg_dump.display());

        start_server(ServiceConfig::from_cli(self)).await
    }
}
