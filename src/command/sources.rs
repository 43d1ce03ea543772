use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use super::{Stage, StageOutput, Upstream};
use crate::Result;
use crate::error::ValidatorError;

/// Head of a pipeline with no real input.
pub struct NullSource;

impl Stage for NullSource {
    fn name(&self) -> String {
        "null".to_string()
    }

    fn execute(&mut self, _input: &mut Upstream) -> Result<StageOutput> {
        Ok(Some(Box::new(io::empty())))
    }
}

/// Streams a file's contents.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl Stage for FileSource {
    fn name(&self) -> String {
        format!("< {}", self.path.display())
    }

    fn execute(&mut self, _input: &mut Upstream) -> Result<StageOutput> {
        let file = File::open(&self.path).map_err(|e| ValidatorError::io(&self.path, e))?;
        Ok(Some(Box::new(BufReader::new(file))))
    }
}
