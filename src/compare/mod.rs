//! Comparator capability: per-file-type `compare` and `dump`.
//!
//! Most strategies follow one shape: normalize each file into a canonical text form through a
//! [`Pipeline`] of external tools, then run `diff` over the two canonical forms. That shape is
//! [`PreprocessingComparator`]; the type-specific part is a [`Preprocess`] implementation.

pub mod cat;
pub mod inf;
pub mod pe;
pub mod registry;

pub use cat::CatPreprocessor;
pub use inf::InfPreprocessor;
pub use pe::{PeComparator, PeHeaderPreprocessor, ResourcePreprocessor, sort_imports};
pub use registry::ComparatorRegistry;

use anyhow::Context;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

use crate::Result;
use crate::command::{FileSource, Filter, NullSource, Pipeline, SharedText, TextSink};
use crate::utils::config::PackagePaths;

/// Compare two files or dump one, as text. Blank text means nothing worth reporting.
pub trait Comparator: Send + Sync {
    fn compare(&self, old: &Path, new: &Path) -> Result<String>;

    fn dump(&self, path: &Path) -> Result<String>;
}

/// Fallback for unrecognized file types.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullComparator;

impl Comparator for NullComparator {
    fn compare(&self, _old: &Path, _new: &Path) -> Result<String> {
        Ok(String::new())
    }

    fn dump(&self, _path: &Path) -> Result<String> {
        Ok(String::new())
    }
}

/// Writes the canonical form of `input` into `output`.
pub trait Preprocess: Send + Sync {
    fn preprocess(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Normalize both files into temp files, then `diff` them.
pub struct PreprocessingComparator<P> {
    preprocessor: P,
    diff: PathBuf,
}

impl<P: Preprocess> PreprocessingComparator<P> {
    pub fn new(preprocessor: P, diff: impl Into<PathBuf>) -> Self {
        PreprocessingComparator {
            preprocessor,
            diff: diff.into(),
        }
    }

    fn canonical(&self, input: &Path) -> Result<TempPath> {
        let output = temp_path()?;
        self.preprocessor
            .preprocess(input, &output)
            .with_context(|| format!("normalize {}", input.display()))?;
        Ok(output)
    }
}

impl<P: Preprocess> Comparator for PreprocessingComparator<P> {
    fn compare(&self, old: &Path, new: &Path) -> Result<String> {
        let old_canonical = self.canonical(old)?;
        let new_canonical = self.canonical(new)?;

        let text = SharedText::default();
        Pipeline::new(NullSource)
            .pipe(Filter::new(
                &self.diff,
                [old_canonical.as_os_str(), new_canonical.as_os_str()],
            ))
            .pipe(TextSink::new(text.clone()))
            .wait()?;
        Ok(text.take())
    }

    fn dump(&self, path: &Path) -> Result<String> {
        let canonical = self.canonical(path)?;

        let text = SharedText::default();
        Pipeline::new(FileSource::new(canonical.to_path_buf()))
            .pipe(TextSink::new(text.clone()))
            .wait()?;
        Ok(text.take())
    }
}

/// Fresh empty temp file, removed when the returned path is dropped.
pub(crate) fn temp_path() -> Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix(PackagePaths::get().temp_prefix())
        .tempfile()
        .context("create temp file")?;
    Ok(file.into_temp_path())
}
