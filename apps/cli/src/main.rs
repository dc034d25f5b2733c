//! ceofinder CLI — find company CEOs from a CSV of company names.
//!
//! Reads a spreadsheet of companies, asks a stack of AI and contact-data
//! APIs who runs each one, and writes the enriched spreadsheet back out.

mod commands;
mod summary;

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
