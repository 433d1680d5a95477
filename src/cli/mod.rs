mod commands;
pub mod types;

pub use commands::{PruneCommand, ServeCommand};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "dump-cache",
    version = env!("CARGO_PKG_VERSION"),
    about = "Serves a cached database dump, regenerating it at most once at a time",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Serve(ServeCommand),
    Prune(PruneCommand),
}

impl Commands {
    pub async fn execute(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match self {
            Commands::Serve(command) => command.execute().await,
            Commands::Prune(command) => command.execute().await,
        }
    }
}
