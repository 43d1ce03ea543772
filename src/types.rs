//! Public and internal types for the buildval API and processors.

use serde::Deserialize;
use std::path::PathBuf;

use crate::utils::config::DEFAULT_SUBSTITUTIONS;

/// How a new-tree file's old-tree counterpart was located.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchLevel {
    /// Same relative path, same case.
    FullMatch,
    /// Same relative path, different case. Worth flagging: downstream tooling may be case-sensitive.
    CaseInsensitiveMatch,
    /// Found only after rewriting a legacy platform-name prefix.
    SubstitutionMatch,
    /// No counterpart.
    NoMatch,
}

impl MatchLevel {
    /// Line printed under the diff header for anything short of a full match.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            MatchLevel::CaseInsensitiveMatch => Some("(NOTE: File paths differ in case)"),
            MatchLevel::SubstitutionMatch => {
                Some("(NOTE: New file has no exact counterpart in old tree, using a substitution)")
            }
            MatchLevel::FullMatch | MatchLevel::NoMatch => None,
        }
    }
}

/// A new-tree file and its old-tree counterpart. `old` is `None` exactly when `level` is `NoMatch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePair {
    pub old: Option<PathBuf>,
    pub new: PathBuf,
    pub level: MatchLevel,
}

/// Legacy platform-name prefix and its canonical replacement (e.g. `Win10` → `Win8`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

impl Substitution {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Substitution {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Built-in table, in priority order.
    pub fn defaults() -> Vec<Substitution> {
        DEFAULT_SUBSTITUTIONS
            .iter()
            .map(|(from, to)| Substitution::new(*from, *to))
            .collect()
    }
}

/// Locations of the external analysis tools. `resedit` is optional; without it embedded
/// resources are not compared.
#[derive(Clone, Debug)]
pub struct ToolPaths {
    pub sed: PathBuf,
    pub diff: PathBuf,
    pub sigcheck: PathBuf,
    pub dumpbin: PathBuf,
    pub resedit: Option<PathBuf>,
}

/// Options for [`validate_dirs`](crate::validate_dirs) and [`dump_dir`](crate::dump_dir).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Exclude specs (`*`, `?` wildcards), matched case-insensitively against file names.
    pub exclude: Vec<String>,
    /// Ordered old-tree fallback rewrites. First match wins.
    pub substitutions: Vec<Substitution>,
    /// Max comparisons in flight. When None, host parallelism capped by the FD limit.
    pub parallelism: Option<usize>,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
    /// Debug logging and a progress counter on stderr.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Opts {
            exclude: Vec::new(),
            substitutions: Substitution::defaults(),
            parallelism: None,
            follow_links: false,
            verbose: false,
        }
    }
}
