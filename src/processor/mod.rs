//! Tree processing: walk a root, launch one comparison unit per file under a strict in-flight
//! cap, and collect results in creation order.

pub mod context;
pub mod diff;
pub mod dump;
pub mod limiter;
pub mod orphans;
pub mod resolve;
pub mod runner;
pub mod walk;

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::Result;

pub use context::{WalkContext, compute_parallelism};
pub use diff::{DiffProcessor, compare_pair};
pub use dump::DumpProcessor;
pub use limiter::{InFlightLimiter, Permit};
pub use orphans::{find_orphans, report_orphans};
pub use resolve::{lookup_case_insensitive, resolve_old_file, strip_prefix_ignore_case};
pub use runner::run_processor;
pub use walk::walk_files;

/// One comparison unit's work, run on its own thread. Returns the text to print (may be empty).
pub type Job = Box<dyn FnOnce() -> Result<String> + Send + 'static>;

/// What to do with each file the walk yields.
pub trait Processor {
    /// Tree being walked.
    fn root(&self) -> &Path;

    /// Build the unit for `file`. Runs on the walking thread, so anything recorded in `seen`
    /// here is visible before the unit starts.
    fn task(&self, file: &Path, seen: &SeenFiles) -> Result<Job>;
}

/// Old-tree files claimed by some new-tree file, keyed case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct SeenFiles(Arc<Mutex<HashSet<String>>>);

fn seen_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

impl SeenFiles {
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, path: &Path) {
        self.lock().insert(seen_key(path));
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(&seen_key(path))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
