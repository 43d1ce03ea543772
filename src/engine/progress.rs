//! Progress counter for comparisons (stderr, verbose mode only)

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

/// Shared progress bar handle.
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " files"
    )))
}

/// Force a refresh of the bar (e.g. so counter shows "0 files" immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Update progress bar if available.
/// Uses try_lock so finishing units never wait on each other; a skipped tick is caught up by
/// [`finish_bar`].
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Set the final count and end the bar's line.
pub fn finish_bar(pb: &ProgressBar, total: usize) {
    let mut bar = pb.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _ = bar.update_to(total);
    eprintln!();
}
