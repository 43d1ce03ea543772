//! External process stage: upstream → stdin, stdout → next stage.

use log::debug;
use std::ffi::{OsStr, OsString};
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::process::{ChildStdin, Command, Stdio};
use std::thread;

use super::{Stage, StageOutput, Upstream};
use crate::Result;
use crate::error::ValidatorError;

/// Runs an external program as a filter. Output is fully buffered in memory.
///
/// Stdout is drained on a helper thread while the stage thread feeds stdin; many tools stop
/// reading input once their output pipe is full, so feeding first and reading afterwards
/// deadlocks on large inputs.
#[derive(Debug)]
pub struct Filter {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    check_status: bool,
}

impl Filter {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Filter {
            program: program.into(),
            args: args.into_iter().map(|a| a.as_ref().to_os_string()).collect(),
            current_dir: None,
            check_status: false,
        }
    }

    /// Working directory for the child.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Fail with [`ValidatorError::Process`] on non-zero exit instead of passing stdout on.
    pub fn check_status(mut self) -> Self {
        self.check_status = true;
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

impl Stage for Filter {
    fn name(&self) -> String {
        format!("| {}", self.program_name())
    }

    fn execute(&mut self, input: &mut Upstream) -> Result<StageOutput> {
        let source = input.stream()?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        let mut child = command
            .spawn()
            .map_err(|e| ValidatorError::io(&self.program, e))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("{}: stdout not captured", self.program_name()))?;
        let drain = thread::spawn(move || -> io::Result<Vec<u8>> {
            let mut buffer = Vec::new();
            stdout.read_to_end(&mut buffer)?;
            Ok(buffer)
        });

        let fed = feed(source, child.stdin.take());
        let status = child.wait();
        let output = drain
            .join()
            .map_err(|_| ValidatorError::Worker("stdout drain"))?
            .map_err(|e| ValidatorError::io(&self.program, e))?;
        fed.map_err(|e| ValidatorError::io(&self.program, e))?;
        let status = status.map_err(|e| ValidatorError::io(&self.program, e))?;

        if !status.success() {
            if self.check_status {
                return Err(
                    ValidatorError::process(self.program_name(), status.code(), &output).into(),
                );
            }
            debug!(
                "{} exited with {}; keeping its {} bytes of output",
                self.program_name(),
                status,
                output.len()
            );
        }
        Ok(Some(Box::new(Cursor::new(output))))
    }
}

/// Copy `source` into the child's stdin and close it. A tool that exits without reading its
/// input (e.g. `diff a b`) closes the pipe early; that is not an error.
fn feed<R: Read + ?Sized>(source: &mut R, stdin: Option<ChildStdin>) -> io::Result<u64> {
    let Some(mut stdin) = stdin else {
        return Ok(0);
    };
    match io::copy(source, &mut stdin) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("child closed stdin early");
            Ok(0)
        }
        other => other,
    }
}
