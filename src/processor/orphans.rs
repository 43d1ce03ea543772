//! Old-tree files no new-tree file was paired with.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::SeenFiles;
use super::context::WalkContext;
use super::walk::walk_files;
use crate::Result;

/// Walk `old_root` with the same order and excludes as the main walk; keep files absent from
/// `seen`.
pub fn find_orphans(old_root: &Path, ctx: &WalkContext, seen: &SeenFiles) -> Result<Vec<PathBuf>> {
    let mut orphans = Vec::new();
    for file in walk_files(old_root, ctx) {
        let file = file?;
        if !seen.contains(&file) {
            orphans.push(file);
        }
    }
    Ok(orphans)
}

/// One `Old file without new counterpart` line per orphan, each followed by a blank line.
pub fn report_orphans(orphans: &[PathBuf], out: &mut dyn Write) -> Result<()> {
    for orphan in orphans {
        writeln!(out, "Old file without new counterpart: {}\n", orphan.display())?;
    }
    Ok(())
}
