//! repocorpus CLI: scrape hosted repositories into deduplicated text corpora.
//!
//! Scraped dumps can be cleaned (header stripping and comment redaction)
//! and merged into training-ready indexed JSON.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
