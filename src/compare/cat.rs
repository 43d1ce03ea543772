use std::path::{Path, PathBuf};

use super::Preprocess;
use crate::Result;
use crate::command::{FileSink, Filter, NullSource, Pipeline};

/// Catalog fingerprint: the hardware IDs and OS attributes `sigcheck -d` reports.
pub struct CatPreprocessor {
    sigcheck: PathBuf,
    sed: PathBuf,
}

impl CatPreprocessor {
    pub fn new(sigcheck: impl Into<PathBuf>, sed: impl Into<PathBuf>) -> Self {
        CatPreprocessor {
            sigcheck: sigcheck.into(),
            sed: sed.into(),
        }
    }
}

impl Preprocess for CatPreprocessor {
    fn preprocess(&self, input: &Path, output: &Path) -> Result<()> {
        let mut sigcheck = Filter::new(&self.sigcheck, [Path::new("-d"), input]);
        if let Some(dir) = input.parent() {
            sigcheck = sigcheck.current_dir(dir);
        }
        Pipeline::new(NullSource)
            .pipe(sigcheck)
            .pipe(Filter::new(&self.sed, ["-n", "/HWID/p;/OS:/p"]))
            .pipe(FileSink::new(output))
            .wait()
    }
}
