use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Legacy positional switch carrying an exclude list.
const EXCLUDE_PREFIX: &str = "/exclude:";

pub const USAGE: &str = "Usage: buildval [/exclude:filespec1;filespec2;...] [<old_dir>] <new_dir>";

/// Compare two build output trees, or dump one.
#[derive(Clone, Parser)]
#[command(name = "buildval")]
#[command(
    about = "Compare an old and a new build tree file by file; with one directory, dump its normalized contents."
)]
pub struct Cli {
    /// `[/exclude:spec1;spec2;...] [<old_dir>] <new_dir>`
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,

    /// File-name exclude spec (`*` and `?` wildcards, case ignored). Repeat or separate with `;`: -e '*.log;*.pdb'
    #[arg(long, short = 'e', action = ArgAction::Append, value_delimiter = ';')]
    pub exclude: Vec<String>,

    /// Max comparisons in flight. Default: available threads, capped by the open-file limit.
    #[arg(long, short = 'j', value_parser = clap::value_parser!(usize))]
    pub jobs: Option<usize>,

    /// Config file. Default: `.buildval.toml` in the current directory, if present.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Verbose output (debug logging and a progress counter on stderr).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Diff { old: PathBuf, new: PathBuf },
    Dump { root: PathBuf },
}

/// Positional arguments, decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub mode: Mode,
    /// Raw specs from `/exclude:` (not yet split).
    pub exclude: Option<String>,
}

/// Decode `[/exclude:...] [<old_dir>] <new_dir>`. `None` means print usage.
pub fn parse_invocation(args: &[String]) -> Option<Invocation> {
    let (exclude, dirs) = match args.split_first() {
        Some((first, rest)) if first.starts_with(EXCLUDE_PREFIX) => {
            (Some(first[EXCLUDE_PREFIX.len()..].to_string()), rest)
        }
        _ => (None, args),
    };
    if dirs.iter().any(|d| d.starts_with(EXCLUDE_PREFIX)) {
        return None;
    }
    let mode = match dirs {
        [root] => Mode::Dump {
            root: PathBuf::from(root),
        },
        [old, new] => Mode::Diff {
            old: PathBuf::from(old),
            new: PathBuf::from(new),
        },
        _ => return None,
    };
    Some(Invocation { mode, exclude })
}
