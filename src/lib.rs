//! Buildval: compare two build output trees file by file through external analysis tools

pub mod command;
pub mod compare;
pub mod engine;
pub mod error;
pub mod processor;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compare::ComparatorRegistry;
use crate::engine::tools::absolute_dir;
use crate::processor::{
    DiffProcessor, DumpProcessor, WalkContext, find_orphans, report_orphans, run_processor,
};

/// Result alias used by public buildval API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

fn log_config(opts: &Opts) {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
}

/// Diff mode: compare every file under `new` with its counterpart under `old`, write the diff
/// blocks to `out`, then the old files nothing was paired with. Returns those orphans.
pub fn validate_dirs(
    old: &Path,
    new: &Path,
    opts: &Opts,
    registry: Arc<ComparatorRegistry>,
    out: &mut dyn Write,
) -> Result<Vec<PathBuf>> {
    log_config(opts);
    let old = absolute_dir(old)?;
    let new = absolute_dir(new)?;
    let ctx = WalkContext::from_opts(opts);

    let processor = DiffProcessor::new(&old, &new, opts.substitutions.clone(), registry);
    let seen = run_processor(&processor, &ctx, out)?;
    debug!("{} old files paired", seen.len());

    let orphans = find_orphans(&old, &ctx, &seen)?;
    report_orphans(&orphans, out)?;
    out.flush()?;
    Ok(orphans)
}

/// Dump mode: write the normalized form of every file under `root` to `out`.
pub fn dump_dir(
    root: &Path,
    opts: &Opts,
    registry: Arc<ComparatorRegistry>,
    out: &mut dyn Write,
) -> Result<()> {
    log_config(opts);
    let root = absolute_dir(root)?;
    let ctx = WalkContext::from_opts(opts);
    run_processor(&DumpProcessor::new(root, registry), &ctx, out)?;
    out.flush()?;
    Ok(())
}
