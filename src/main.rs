use clap::Parser;
use dump_cache::cli::Cli;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    cli.command.execute().await
}
