//! Entry point for the plasmid dashboard.
//!
//! Loads tab-separated result tables from the plasmid dynamics analysis
//! pipeline and renders the dashboard's exploratory charts (sunburst,
//! scatter, bar) as standalone HTML files.

mod cli;
mod collapse;
mod table;
mod visualization;

use anyhow::Result;
use clap::Parser;
use log::info;

use cli::{run_cli, Cli};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting with arguments: {:?}", cli);

    run_cli(cli)?;

    Ok(())
}
