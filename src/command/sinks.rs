use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{Stage, StageOutput, Upstream};
use crate::Result;
use crate::error::ValidatorError;

/// How a [`FileSink`] opens its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkMode {
    /// Create or truncate.
    Create,
    /// Create or append.
    Append,
}

/// Writes the whole upstream stream into a file and yields nothing.
pub struct FileSink {
    path: PathBuf,
    mode: SinkMode,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_mode(path, SinkMode::Create)
    }

    pub fn with_mode(path: impl Into<PathBuf>, mode: SinkMode) -> Self {
        FileSink {
            path: path.into(),
            mode,
        }
    }
}

impl Stage for FileSink {
    fn name(&self) -> String {
        match self.mode {
            SinkMode::Create => format!("> {}", self.path.display()),
            SinkMode::Append => format!(">> {}", self.path.display()),
        }
    }

    fn execute(&mut self, input: &mut Upstream) -> Result<StageOutput> {
        let mut options = OpenOptions::new();
        match self.mode {
            SinkMode::Create => options.write(true).create(true).truncate(true),
            SinkMode::Append => options.append(true).create(true),
        };
        let mut file = options
            .open(&self.path)
            .map_err(|e| ValidatorError::io(&self.path, e))?;
        let source = input.stream()?;
        io::copy(source, &mut file).map_err(|e| ValidatorError::io(&self.path, e))?;
        file.flush().map_err(|e| ValidatorError::io(&self.path, e))?;
        Ok(None)
    }
}

/// Growable text buffer shared between a [`TextSink`] and whoever reads the result.
#[derive(Clone, Debug, Default)]
pub struct SharedText(Arc<Mutex<String>>);

impl SharedText {
    pub fn push_str(&self, text: &str) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_str(text);
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> String {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Move the contents out, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(
            &mut *self
                .0
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

/// Decodes the upstream stream as text and appends it to a [`SharedText`].
pub struct TextSink {
    buffer: SharedText,
}

impl TextSink {
    pub fn new(buffer: SharedText) -> Self {
        TextSink { buffer }
    }
}

impl Stage for TextSink {
    fn name(&self) -> String {
        "text".to_string()
    }

    fn execute(&mut self, input: &mut Upstream) -> Result<StageOutput> {
        let mut bytes = Vec::new();
        input
            .stream()?
            .read_to_end(&mut bytes)
            .map_err(|e| ValidatorError::io("<pipeline>", e))?;
        self.buffer.push_str(&decode_text(&bytes));
        Ok(None)
    }
}

/// Decode tool output: UTF-16 when it carries a UTF-16 byte order mark, UTF-8 otherwise
/// (lossy, leading BOM dropped).
pub fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
