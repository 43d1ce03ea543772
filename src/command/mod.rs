//! Shell-like pipelines of byte-stream stages.
//!
//! A [`Pipeline`] is built left to right with [`Pipeline::pipe`]. Wiring a stage starts the
//! upstream chain on its own thread right away; the downstream stage blocks on that thread only
//! when it asks for its input via [`Upstream::stream`]. [`Pipeline::run`] executes the terminal
//! stage on the caller's thread and then releases whatever input it held, success or not.
//!
//! ```ignore
//! let text = SharedText::default();
//! Pipeline::new(FileSource::new("driver.inf"))
//!     .pipe(Filter::new("sed", ["s/;.*$//"]))
//!     .pipe(TextSink::new(text.clone()))
//!     .wait()?;
//! ```

mod filter;
mod sinks;
mod sources;

pub use filter::Filter;
pub use sinks::{FileSink, SharedText, SinkMode, TextSink, decode_text};
pub use sources::{FileSource, NullSource};

use log::debug;
use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use crate::Result;
use crate::error::ValidatorError;

/// Byte stream handed from one stage to the next.
pub type ByteStream = Box<dyn Read + Send>;

/// What a stage yields: a stream for the next stage, or nothing for a sink.
pub type StageOutput = Option<ByteStream>;

/// One step of a pipeline.
pub trait Stage: Send + 'static {
    /// Short label for logs.
    fn name(&self) -> String;

    /// Run the stage. Implementations that need input call [`Upstream::stream`]; they never close
    /// it themselves, the runner does that.
    fn execute(&mut self, input: &mut Upstream) -> Result<StageOutput>;
}

/// Input side of a stage: the producer's thread until joined, then the producer's stream.
pub struct Upstream {
    producer: Option<JoinHandle<Result<StageOutput>>>,
    stream: Option<ByteStream>,
}

impl Upstream {
    fn none() -> Self {
        Upstream {
            producer: None,
            stream: None,
        }
    }

    fn from_producer(handle: JoinHandle<Result<StageOutput>>) -> Self {
        Upstream {
            producer: Some(handle),
            stream: None,
        }
    }

    /// Wait for the producer and borrow its output. No producer, or a producer that is itself a
    /// sink, reads as an empty stream. A failed producer surfaces its error here.
    pub fn stream(&mut self) -> Result<&mut (dyn Read + Send + 'static)> {
        if let Some(handle) = self.producer.take() {
            let output = handle
                .join()
                .map_err(|_| ValidatorError::Worker("pipeline stage"))??;
            self.stream = output;
        }
        Ok(&mut **self.stream.get_or_insert_with(|| Box::new(io::empty())))
    }

    /// Join the producer if nobody waited on it, then close its stream. Safe to call twice.
    pub fn release(&mut self) -> Result<()> {
        let joined = match self.producer.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ValidatorError::Worker("pipeline stage"))?
                .map(drop),
            None => Ok(()),
        };
        self.stream.take();
        joined
    }
}

impl Drop for Upstream {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            debug!("unconsumed upstream failed: {:#}", e);
        }
    }
}

/// A stage plus its (possibly still running) upstream chain.
pub struct Pipeline {
    stage: Box<dyn Stage>,
    input: Upstream,
}

impl Pipeline {
    /// Start a pipeline at `head`. The head gets no input.
    pub fn new(head: impl Stage) -> Self {
        Pipeline {
            stage: Box::new(head),
            input: Upstream::none(),
        }
    }

    /// Feed this pipeline's output into `into` and return the extended pipeline.
    /// The chain built so far starts running immediately.
    pub fn pipe(self, into: impl Stage) -> Pipeline {
        let producer = thread::spawn(move || self.run());
        Pipeline {
            stage: Box::new(into),
            input: Upstream::from_producer(producer),
        }
    }

    /// Execute the last stage and release its input. When the stage succeeds but its producer
    /// failed, the producer's error is returned; when both fail the stage's error wins.
    pub fn run(mut self) -> Result<StageOutput> {
        let name = self.stage.name();
        let result = self.stage.execute(&mut self.input);
        let released = self.input.release();
        match (result, released) {
            (Ok(output), Ok(())) => Ok(output),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(upstream)) => {
                debug!("{}: upstream also failed: {:#}", name, upstream);
                Err(e)
            }
        }
    }

    /// Run to completion and drop any output (for chains ending in a sink).
    pub fn wait(self) -> Result<()> {
        self.run().map(drop)
    }
}
