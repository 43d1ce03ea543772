//! Diff mode: pair each new-tree file with its old counterpart and compare them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::resolve::resolve_old_file;
use super::{Job, Processor, SeenFiles};
use crate::compare::ComparatorRegistry;
use crate::{FilePair, MatchLevel, Result, Substitution};

pub struct DiffProcessor {
    old_root: PathBuf,
    new_root: PathBuf,
    substitutions: Arc<Vec<Substitution>>,
    registry: Arc<ComparatorRegistry>,
}

impl DiffProcessor {
    pub fn new(
        old_root: impl Into<PathBuf>,
        new_root: impl Into<PathBuf>,
        substitutions: Vec<Substitution>,
        registry: Arc<ComparatorRegistry>,
    ) -> Self {
        DiffProcessor {
            old_root: old_root.into(),
            new_root: new_root.into(),
            substitutions: Arc::new(substitutions),
            registry,
        }
    }
}

impl Processor for DiffProcessor {
    fn root(&self) -> &Path {
        &self.new_root
    }

    fn task(&self, file: &Path, seen: &SeenFiles) -> Result<Job> {
        let pair = resolve_old_file(file, &self.new_root, &self.old_root, &self.substitutions)?;
        match &pair.old {
            Some(old) => seen.insert(old),
            None => {
                let line = format!("New file without old counterpart: {}\n", file.display());
                return Ok(Box::new(move || -> Result<String> { Ok(line) }));
            }
        }
        let registry = Arc::clone(&self.registry);
        Ok(Box::new(move || compare_pair(&registry, &pair)))
    }
}

/// Diff block for `pair`: header, match-level note, comparator output. Empty when the files
/// compare equal and were found at the exact same path.
pub fn compare_pair(registry: &ComparatorRegistry, pair: &FilePair) -> Result<String> {
    let Some(old) = &pair.old else {
        return Ok(String::new());
    };
    let diff = registry.for_path(old).compare(old, &pair.new)?;
    if diff.trim().is_empty() && pair.level == MatchLevel::FullMatch {
        return Ok(String::new());
    }

    let mut out = format!("Diff {} vs {}:\n", old.display(), pair.new.display());
    if let Some(note) = pair.level.note() {
        out.push_str(note);
        out.push('\n');
    }
    out.push_str(&diff);
    out.push('\n');
    Ok(out)
}
