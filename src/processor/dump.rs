//! Dump mode: the normalized representation of every file in one tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Job, Processor, SeenFiles};
use crate::Result;
use crate::compare::ComparatorRegistry;

pub struct DumpProcessor {
    root: PathBuf,
    registry: Arc<ComparatorRegistry>,
}

impl DumpProcessor {
    pub fn new(root: impl Into<PathBuf>, registry: Arc<ComparatorRegistry>) -> Self {
        DumpProcessor {
            root: root.into(),
            registry,
        }
    }
}

impl Processor for DumpProcessor {
    fn root(&self) -> &Path {
        &self.root
    }

    fn task(&self, file: &Path, _seen: &SeenFiles) -> Result<Job> {
        let registry = Arc::clone(&self.registry);
        let file = file.to_path_buf();
        Ok(Box::new(move || -> Result<String> {
            let dump = registry.for_path(&file).dump(&file)?;
            if dump.trim().is_empty() {
                return Ok(String::new());
            }
            Ok(format!("Dump of {}:\n{}\n", file.display(), dump))
        }))
    }
}
