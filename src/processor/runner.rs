use anyhow::Context;
use log::debug;
use std::io::{self, Write};
use std::thread::{self, JoinHandle};

use super::context::WalkContext;
use super::limiter::InFlightLimiter;
use super::walk::walk_files;
use super::{Processor, SeenFiles};
use crate::Result;
use crate::engine::progress::{
    ProgressBar, create_counter, finish_bar, refresh_bar, update_progress_bar,
};
use crate::error::ValidatorError;

/// Walk `processor.root()`, run one unit per file with at most `ctx.parallelism` in flight, then
/// write every non-empty result to `out` (each followed by a newline) in the order the units were
/// created. Returns the old-tree files the processor recorded.
///
/// The first failure (walk, task creation or unit) is returned after every launched unit has
/// been joined; results after it are not written. A walk or task-creation failure writes
/// nothing at all.
pub fn run_processor(
    processor: &dyn Processor,
    ctx: &WalkContext,
    out: &mut dyn Write,
) -> Result<SeenFiles> {
    let seen = SeenFiles::default();
    let limiter = InFlightLimiter::new(ctx.parallelism);
    let progress = ctx.show_progress.then(|| {
        let pb = create_counter("Comparing");
        refresh_bar(&pb);
        pb
    });

    let mut units: Vec<JoinHandle<Result<String>>> = Vec::new();
    let launch = launch_units(processor, ctx, &seen, &limiter, progress.as_ref(), &mut units);
    debug!(
        "walk of {} done: {} units launched",
        processor.root().display(),
        units.len()
    );

    let count = units.len();
    // a failed walk writes nothing; launched units are still joined
    let mut discard = io::sink();
    let sink: &mut dyn Write = if launch.is_ok() { out } else { &mut discard };
    let rundown = rundown(units, sink);
    if let Some(pb) = &progress {
        finish_bar(pb, count);
    }
    launch?;
    rundown?;
    Ok(seen)
}

fn launch_units(
    processor: &dyn Processor,
    ctx: &WalkContext,
    seen: &SeenFiles,
    limiter: &InFlightLimiter,
    progress: Option<&ProgressBar>,
    units: &mut Vec<JoinHandle<Result<String>>>,
) -> Result<()> {
    for file in walk_files(processor.root(), ctx) {
        let file = file?;
        let job = processor
            .task(&file, seen)
            .with_context(|| format!("prepare {}", file.display()))?;
        let permit = limiter.acquire()?;
        let progress = progress.cloned();
        units.push(thread::spawn(move || {
            let _permit = permit;
            let result = job().with_context(|| format!("process {}", file.display()));
            if let Some(pb) = &progress {
                update_progress_bar(pb, 1);
            }
            result
        }));
    }
    Ok(())
}

/// Join every unit in creation order. Output stops at the first failure; the rest are still
/// joined so no thread outlives the run.
fn rundown(units: Vec<JoinHandle<Result<String>>>, out: &mut dyn Write) -> Result<()> {
    let mut first_error: Option<anyhow::Error> = None;
    for unit in units {
        let result = unit
            .join()
            .unwrap_or_else(|_| Err(ValidatorError::Worker("comparison unit").into()));
        if first_error.is_some() {
            continue;
        }
        match result {
            Ok(text) if text.is_empty() => {}
            Ok(text) => {
                if let Err(e) = writeln!(out, "{text}") {
                    first_error = Some(e.into());
                }
            }
            Err(e) => first_error = Some(e),
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
