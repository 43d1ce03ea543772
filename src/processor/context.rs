//! Walk context and tuning: compiled excludes plus the in-flight budget derived from host threads
//! and the FD limit.

use log::debug;

use crate::Opts;
use crate::engine::tools::{ExcludeSpec, compile_excludes};
use crate::utils::cap_by_fd_limit;
use crate::utils::config::WorkerThreadLimits;

/// Settings shared by every walk of one run (new tree, then old tree for orphans).
#[derive(Clone, Debug)]
pub struct WalkContext {
    pub excludes: Vec<ExcludeSpec>,
    pub follow_links: bool,
    /// Max comparison units in flight.
    pub parallelism: usize,
    /// Show a kdam counter on stderr while units finish.
    pub show_progress: bool,
}

impl WalkContext {
    pub fn from_opts(opts: &Opts) -> Self {
        let parallelism = compute_parallelism(opts.parallelism);
        let excludes = compile_excludes(&opts.exclude);
        debug!(
            "walk context: parallelism={}, excludes=[{}], follow_links={}",
            parallelism,
            excludes
                .iter()
                .map(ExcludeSpec::as_str)
                .collect::<Vec<_>>()
                .join(";"),
            opts.follow_links
        );
        WalkContext {
            excludes,
            follow_links: opts.follow_links,
            parallelism,
            show_progress: opts.verbose,
        }
    }
}

/// Explicit value when given, else all rayon threads; both capped by the FD limit.
pub fn compute_parallelism(explicit: Option<usize>) -> usize {
    let limits = WorkerThreadLimits::current();
    let wanted = explicit
        .filter(|&n| n > 0)
        .unwrap_or(limits.all_threads)
        .max(limits.floor);
    cap_by_fd_limit(wanted)
}
