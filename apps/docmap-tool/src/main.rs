//! CLI tool for inspecting schemas and previewing partial updates.
//!
//! Provides commands for:
//! - Diffing two document versions into an update payload
//! - Listing generated accessors
//! - Invoking a single accessor on a stored document

use clap::Parser;
use docmap_tool::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Running {:?}", cli.command);
    let output = docmap_tool::run(&cli)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
