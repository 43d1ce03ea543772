//! INF normalization: note the line-ending style, strip comments, trailing whitespace and blank
//! lines, and zero the `DriverVer` date and build number.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use super::Preprocess;
use crate::Result;
use crate::command::{FileSink, FileSource, Filter, Pipeline, SinkMode};
use crate::error::ValidatorError;

/// Comments (`;` to end of line), trailing whitespace, then blank lines.
const STRIP_SCRIPT: &str = r"s/;.*$//;s/\s*$//;/^\s*$/d";
/// `DriverVer=mm/dd/yyyy,a.b.c.d` becomes `DriverVer=00/00/0000,a.b.c.0`.
const DRIVER_VER_SCRIPT: &str =
    r"s#DriverVer=[^,]*,\([^\.]*\.[^\.]*\.[^\.]*\)\..*$#DriverVer=00/00/0000,\1.0#";

const DETECT_CHUNK: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEnding {
    CrLf,
    Lf,
    Unknown,
}

impl LineEnding {
    fn describe(self) -> &'static str {
        match self {
            LineEnding::CrLf => "File uses CR LF line endings.",
            LineEnding::Lf => "File uses LF line endings.",
            LineEnding::Unknown => "Failed to detect line endings in this file.",
        }
    }
}

/// Guess the line-ending style from the first line break in the file.
pub fn detect_line_ending(path: &Path) -> Result<LineEnding> {
    let mut reader =
        BufReader::new(File::open(path).map_err(|e| ValidatorError::io(path, e))?);
    let mut chunk = [0u8; DETECT_CHUNK];
    loop {
        let n = reader
            .read(&mut chunk)
            .map_err(|e| ValidatorError::io(path, e))?;
        if n == 0 {
            return Ok(LineEnding::Unknown);
        }
        match chunk[..n].iter().find(|&&b| b == b'\r' || b == b'\n') {
            Some(b'\r') => return Ok(LineEnding::CrLf),
            Some(_) => return Ok(LineEnding::Lf),
            None => {}
        }
    }
}

pub struct InfPreprocessor {
    sed: PathBuf,
}

impl InfPreprocessor {
    pub fn new(sed: impl Into<PathBuf>) -> Self {
        InfPreprocessor { sed: sed.into() }
    }
}

impl Preprocess for InfPreprocessor {
    fn preprocess(&self, input: &Path, output: &Path) -> Result<()> {
        let ending = detect_line_ending(input)?;
        {
            let mut header = File::create(output).map_err(|e| ValidatorError::io(output, e))?;
            writeln!(header, "{}", ending.describe())
                .and_then(|_| writeln!(header))
                .map_err(|e| ValidatorError::io(output, e))?;
        }

        Pipeline::new(FileSource::new(input))
            .pipe(Filter::new(&self.sed, [STRIP_SCRIPT]))
            .pipe(Filter::new(&self.sed, [DRIVER_VER_SCRIPT]))
            .pipe(FileSink::with_mode(output, SinkMode::Append))
            .wait()
    }
}
