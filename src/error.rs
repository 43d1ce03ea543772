//! Error types for buildval
//!
//! Application flow uses `anyhow` (see [`crate::Result`]); these typed errors sit underneath
//! so callers can downcast when the kind of failure matters:
//! - configuration errors are fatal before any traversal starts
//! - I/O errors abort the current unit and, through rundown, the whole run
//! - process errors only come from filters that opted into exit-status checking

use std::path::PathBuf;
use thiserror::Error;

/// Longest stdout prefix carried in [`ValidatorError::Process`].
pub const PROCESS_OUTPUT_PREFIX_LEN: usize = 512;

#[derive(Error, Debug)]
pub enum ValidatorError {
    /// A required external tool is not where the configuration says it is
    #[error("{tool} tool not found in '{}'", path.display())]
    Configuration { tool: String, path: PathBuf },

    /// File vanished, is locked, or could not be created
    #[error("I/O error on '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External tool exited with a non-zero status
    #[error("'{program}' exited with code {code:?}: {output}")]
    Process {
        program: String,
        code: Option<i32>,
        output: String,
    },

    /// Directory traversal failed
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A pipeline or comparison thread panicked
    #[error("{0} thread panicked")]
    Worker(&'static str),
}

impl ValidatorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ValidatorError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a process error, keeping only a bounded prefix of what the tool printed.
    pub fn process(program: impl Into<String>, code: Option<i32>, stdout: &[u8]) -> Self {
        let text = String::from_utf8_lossy(stdout);
        let output = match text.char_indices().nth(PROCESS_OUTPUT_PREFIX_LEN) {
            Some((idx, _)) => format!("{}...", &text[..idx]),
            None => text.into_owned(),
        };
        ValidatorError::Process {
            program: program.into(),
            code,
            output,
        }
    }
}
