//! Engine module: CLI, handlers, progress and path/tool helpers

pub mod arg_parser;
pub mod handlers;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Invocation, Mode, USAGE, parse_invocation};
pub use handlers::handle_run;
pub use tools::{ExcludeSpec, glob_match, is_excluded, parse_exclude_list, path_relative_to};
