//! Application configuration constants.
//! Tool names, tuning and defaults in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    temp_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                temp_prefix: format!("{pkg}-"),
            }
        })
    }

    /// Config file looked up in the current directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Prefix for temp files and directories created while normalizing.
    pub fn temp_prefix(&self) -> &str {
        &self.temp_prefix
    }
}

// ---- External tools ----

/// Default executable names, resolved through `PATH` unless the config gives a path.
pub struct ToolNames;

impl ToolNames {
    pub const SED: &'static str = "sed";
    pub const DIFF: &'static str = "diff";
    pub const SIGCHECK: &'static str = "sigcheck";
    pub const DUMPBIN: &'static str = "dumpbin";
    pub const RESEDIT: &'static str = "resedit";
}

// ---- Path pairing ----

/// Legacy platform-name prefixes and their canonical replacements, in priority order.
pub const DEFAULT_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("Win8.1", "Win8"),
    ("Win10", "Win8"),
    ("w8.1", "w8"),
    ("Wxp", "XP"),
    ("Wnet", "XP"),
    ("Wlh", "Vista"),
];

// ---- Worker threads ----

/// Limits for the comparison fan-out.
/// Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Never run fewer comparisons than this at once.
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const FLOOR_THREADS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }
}

// ---- Import listing ----

/// `dumpbin /IMPORTS` indentation: module lines start with four spaces, symbol lines with ten.
pub struct ImportListing;

impl ImportListing {
    pub const MODULE_INDENT: &'static str = "    ";
    pub const SYMBOL_INDENT: &'static str = "          ";
    /// Everything from this line on is a summary of sections, not imports.
    pub const SUMMARY_MARKER: &'static str = "  Summary";
}
