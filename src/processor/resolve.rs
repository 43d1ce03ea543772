//! Locating a new-tree file's counterpart in the old tree.
//!
//! Lookup order: the same relative path (exact case, then any case), then each substitution in
//! declared order. Returned paths are always spelled the way they are on disk.

use log::debug;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::engine::tools::path_relative_to;
use crate::error::ValidatorError;
use crate::{FilePair, MatchLevel, Result, Substitution};

/// Filesystems that fold case, where an exact-case `exists()` proves nothing about spelling.
const CASE_FOLDING_FS: bool = cfg!(any(windows, target_os = "macos"));

fn names_equal_ignore_case(a: &OsStr, b: &OsStr) -> bool {
    a == b || a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// Find the on-disk entry in `dir` named `name`: exact spelling first, then any case.
fn find_entry(dir: &Path, name: &OsStr) -> io::Result<Option<PathBuf>> {
    let candidate = dir.join(name);
    if !CASE_FOLDING_FS && fs::symlink_metadata(&candidate).is_ok() {
        return Ok(Some(candidate));
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    let mut folded = None;
    for entry in entries {
        let entry = entry?;
        let entry_name = entry.file_name();
        if entry_name == name {
            return Ok(Some(entry.path()));
        }
        if folded.is_none() && names_equal_ignore_case(&entry_name, name) {
            folded = Some(entry.path());
        }
    }
    Ok(folded)
}

/// Resolve `rel` under `root` one component at a time, ignoring case where needed.
/// `Ok(None)` when no regular file matches.
pub fn lookup_case_insensitive(root: &Path, rel: &Path) -> io::Result<Option<PathBuf>> {
    let mut current = root.to_path_buf();
    for component in rel.components() {
        let name = match component {
            Component::Normal(name) => name,
            Component::CurDir => continue,
            _ => return Ok(None),
        };
        if !current.is_dir() {
            return Ok(None);
        }
        match find_entry(&current, name)? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(current.is_file().then_some(current))
}

/// `text` with `prefix` removed when it starts with it, comparing case-insensitively.
pub fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = rest.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(match rest.next() {
        Some((idx, _)) => &text[idx..],
        None => "",
    })
}

/// Pair `new_file` (under `new_root`) with its old-tree counterpart.
pub fn resolve_old_file(
    new_file: &Path,
    new_root: &Path,
    old_root: &Path,
    substitutions: &[Substitution],
) -> Result<FilePair> {
    let rel = path_relative_to(new_file, new_root).ok_or_else(|| {
        anyhow::anyhow!(
            "{} is not under {}",
            new_file.display(),
            new_root.display()
        )
    })?;
    let pair = |old: Option<PathBuf>, level| FilePair {
        old,
        new: new_file.to_path_buf(),
        level,
    };

    let expected = old_root.join(&rel);
    if let Some(found) =
        lookup_case_insensitive(old_root, &rel).map_err(|e| ValidatorError::io(&expected, e))?
    {
        let level = if found == expected {
            MatchLevel::FullMatch
        } else {
            MatchLevel::CaseInsensitiveMatch
        };
        return Ok(pair(Some(found), level));
    }

    let rel_text = rel.to_string_lossy();
    for subst in substitutions {
        let Some(tail) = strip_prefix_ignore_case(&rel_text, &subst.from) else {
            continue;
        };
        let rewritten = PathBuf::from(format!("{}{}", subst.to, tail));
        if let Some(found) = lookup_case_insensitive(old_root, &rewritten)
            .map_err(|e| ValidatorError::io(old_root.join(&rewritten), e))?
        {
            debug!(
                "{}: matched via {} -> {}",
                rel.display(),
                subst.from,
                subst.to
            );
            return Ok(pair(Some(found), MatchLevel::SubstitutionMatch));
        }
    }

    Ok(pair(None, MatchLevel::NoMatch))
}
