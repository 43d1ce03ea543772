//! Extension → comparator table. Built once at startup, read-only afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::cat::CatPreprocessor;
use super::inf::InfPreprocessor;
use super::pe::PeComparator;
use super::{Comparator, NullComparator, PreprocessingComparator};
use crate::ToolPaths;

pub struct ComparatorRegistry {
    by_extension: HashMap<String, Arc<dyn Comparator>>,
    fallback: Arc<dyn Comparator>,
}

impl ComparatorRegistry {
    /// No entries; every file gets the null comparator.
    pub fn empty() -> Self {
        ComparatorRegistry {
            by_extension: HashMap::new(),
            fallback: Arc::new(NullComparator),
        }
    }

    /// The standard table: `.inf`, `.cat`, and PE images (`.sys`, `.dll`, `.exe`).
    pub fn standard(tools: &ToolPaths) -> Self {
        let inf: Arc<dyn Comparator> = Arc::new(PreprocessingComparator::new(
            InfPreprocessor::new(&tools.sed),
            &tools.diff,
        ));
        let cat: Arc<dyn Comparator> = Arc::new(PreprocessingComparator::new(
            CatPreprocessor::new(&tools.sigcheck, &tools.sed),
            &tools.diff,
        ));
        let pe: Arc<dyn Comparator> = Arc::new(PeComparator::new(tools));

        Self::empty()
            .with("inf", inf)
            .with("cat", cat)
            .with("sys", Arc::clone(&pe))
            .with("dll", Arc::clone(&pe))
            .with("exe", pe)
    }

    /// Register `comparator` for `extension` (leading dot optional, case ignored).
    pub fn with(mut self, extension: &str, comparator: Arc<dyn Comparator>) -> Self {
        self.by_extension
            .insert(normalize_extension(extension), comparator);
        self
    }

    /// Comparator for `path` by its extension, or the null comparator.
    pub fn for_path(&self, path: &Path) -> &dyn Comparator {
        let found = path.extension().and_then(|ext| {
            self.by_extension
                .get(&normalize_extension(&ext.to_string_lossy()))
        });
        &**found.unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}
