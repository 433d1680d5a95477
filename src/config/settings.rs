use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::cache::RetentionPolicy;

/// Everything the `serve` command needs, resolved from flags and environment.
#[derive(Debug)]
pub struct ServiceConfig {
    pub database_url: SecretString,
    pub api_token: SecretString,
    pub dump_dir: PathBuf,
    pub ttl: Duration,
    pub host: String,
    pub port: u16,
    pub retention: RetentionPolicy,
    pub pg_dump: PathBuf,
}

impl ServiceConfig {
    pub fn from_cli(cli: &crate::cli::ServeCommand) -> Self {
        Self {
            database_url: SecretString::from(cli.database_url.clone()),
            api_token: SecretString::from(cli.api_token.clone()),
            dump_dir: cli.dump_dir.clone(),
            ttl: Duration::from_secs(cli.ttl),
            host: cli.host.clone(),
            port: cli.port,
            retention: RetentionPolicy::new(cli.keep),
            pg_dump: cli.pg_dump.clone(),
        }
    }
}
