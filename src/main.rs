//! Buildval CLI: diff an old and a new build tree, or dump one tree.

use anyhow::Result;
use buildval::engine::arg_parser::Cli;
use buildval::engine::handle_run;
use clap::Parser;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
