//! Depth-first tree walk: files before subdirectories at each level, names sorted in each group.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::context::WalkContext;
use crate::engine::tools::is_excluded;
use crate::error::ValidatorError;

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    a_dir
        .cmp(&b_dir)
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Iterator over the regular files under `root` that no exclude spec matches.
/// Traversal failures come through as [`ValidatorError::Walk`].
pub fn walk_files<'a>(
    root: &Path,
    ctx: &'a WalkContext,
) -> impl Iterator<Item = Result<PathBuf, ValidatorError>> + 'a {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(ctx.follow_links)
        .sort_by(files_first)
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() || is_excluded(entry.file_name(), &ctx.excludes)
                {
                    return None;
                }
                Some(Ok(entry.into_path()))
            }
            Err(err) => Some(Err(ValidatorError::Walk(err))),
        })
}
