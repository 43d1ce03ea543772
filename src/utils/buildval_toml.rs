//! Load `.buildval.toml` (CLI only). Lib callers pass [`Opts`] and [`ToolPaths`](crate::ToolPaths) directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{Opts, Substitution};

#[derive(Debug, Default, Deserialize)]
pub struct BuildvalToml {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    tools: ToolsSection,
    /// Replaces the built-in table when present; order is priority.
    substitutions: Option<Vec<Substitution>>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    exclude: Option<Vec<String>>,
    jobs: Option<usize>,
    follow_links: Option<bool>,
    verbose: Option<bool>,
}

/// Tool locations from the `[tools]` table: a bare name is looked up on `PATH`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ToolsSection {
    pub sed: Option<String>,
    pub diff: Option<String>,
    pub sigcheck: Option<String>,
    pub dumpbin: Option<String>,
    pub resedit: Option<String>,
}

impl BuildvalToml {
    pub fn tools(&self) -> &ToolsSection {
        &self.tools
    }
}

pub fn parse_config(text: &str) -> Result<BuildvalToml> {
    toml::from_str(text).context("parse config")
}

/// Load the config file. An explicit path must exist and parse. Otherwise `.buildval.toml` in
/// the current directory is used if present; a broken default file is only warned about.
pub fn load_config_file(explicit: Option<&Path>) -> Result<Option<BuildvalToml>> {
    if let Some(path) = explicit {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        return parse_config(&text)
            .with_context(|| format!("config {}", path.display()))
            .map(Some);
    }
    let path = PathBuf::from(PackagePaths::get().config_filename());
    let Ok(text) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    Ok(parse_config(&text)
        .map_err(|e| log::warn!("{}: {:#}", path.display(), e))
        .ok())
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $field:ident => $opts_field:ident) => {
        if let Some(v) = $section.$field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &BuildvalToml, opts: &mut Opts) {
    let settings = &file.settings;
    if let Some(ref v) = settings.exclude {
        opts.exclude = v.clone();
    }
    if let Some(jobs) = settings.jobs {
        opts.parallelism = Some(jobs);
    }
    apply_file_opt!(settings, opts, follow_links => follow_links);
    apply_file_opt!(settings, opts, verbose => verbose);
    if let Some(ref subs) = file.substitutions {
        opts.substitutions = subs.clone();
    }
}
