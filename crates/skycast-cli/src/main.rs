use anyhow::Result;
use clap::Parser;

mod cli;
mod report;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skycast_core::init()?;

    let cli = cli::Cli::parse();
    cli.run().await
}
