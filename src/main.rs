use anyhow::Result;
use clap::Parser;
use traffic_watcher::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    cli::execute(cli).await
}
