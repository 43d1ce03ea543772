//! Path, exclusion and external-tool utilities

use anyhow::{Context, Result};
use log::warn;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::ToolPaths;
use crate::error::ValidatorError;
use crate::utils::ToolsSection;
use crate::utils::config::ToolNames;

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Make `root` absolute (without resolving symlinks) and check it is a directory.
pub fn absolute_dir(root: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(root)
        .with_context(|| format!("resolve directory {}", root.display()))?;
    if !abs.is_dir() {
        anyhow::bail!("not a directory: {}", abs.display());
    }
    Ok(abs)
}

/// Compiled file-name exclusion pattern. `*` and `?` are wildcards, everything else (including
/// `.`) is literal. Matching ignores case.
#[derive(Clone, Debug)]
pub struct ExcludeSpec {
    spec: String,
    pattern: Vec<char>,
}

impl ExcludeSpec {
    pub fn new(spec: &str) -> Self {
        ExcludeSpec {
            spec: spec.to_string(),
            pattern: spec.to_lowercase().chars().collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.spec
    }

    pub fn matches(&self, name: &str) -> bool {
        let text: Vec<char> = name.to_lowercase().chars().collect();
        glob_match_chars(&self.pattern, &text)
    }
}

/// Split a `spec1;spec2,spec3` list into compiled specs, skipping empty items.
pub fn parse_exclude_list(list: &str) -> Vec<ExcludeSpec> {
    list.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ExcludeSpec::new)
        .collect()
}

/// Compile every pattern; each may itself be a `;`/`,` separated list.
pub fn compile_excludes(patterns: &[String]) -> Vec<ExcludeSpec> {
    patterns.iter().flat_map(|p| parse_exclude_list(p)).collect()
}

/// True if the file name matches any spec. Only the name is checked, never the path.
pub fn is_excluded(name: &OsStr, specs: &[ExcludeSpec]) -> bool {
    if specs.is_empty() {
        return false;
    }
    let name = name.to_string_lossy();
    specs.iter().any(|spec| spec.matches(&name))
}

/// Simple glob pattern matching (supports * and ?). Case-sensitive; see [`ExcludeSpec`] for
/// the case-insensitive form.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_chars(&pattern, &text)
}

fn glob_match_chars(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position of the last `*` and the text index it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Find an executable: values containing a path separator are taken as-is, bare names are
/// searched on `PATH` (with `.exe` appended on Windows).
pub fn find_executable(name: &str) -> PathBuf {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    let file_name = if cfg!(windows) && candidate.extension().is_none() {
        format!("{name}.exe")
    } else {
        name.to_string()
    };
    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(&file_name))
                .find(|p| p.is_file())
        })
        .unwrap_or_else(|| candidate.to_path_buf())
}

/// Resolve tool locations from the `[tools]` table (or defaults) and check they exist.
/// A missing required tool is a [`ValidatorError::Configuration`]; a missing `resedit` only
/// disables resource comparison.
pub fn resolve_tools(overrides: &ToolsSection) -> Result<ToolPaths, ValidatorError> {
    let required = |label: &str, value: &Option<String>, default: &str| {
        let path = find_executable(value.as_deref().unwrap_or(default));
        if path.is_file() {
            Ok(path)
        } else {
            Err(ValidatorError::Configuration {
                tool: label.to_string(),
                path,
            })
        }
    };
    let sed = required("Sed", &overrides.sed, ToolNames::SED)?;
    let diff = required("Diff", &overrides.diff, ToolNames::DIFF)?;
    let sigcheck = required("Sigcheck", &overrides.sigcheck, ToolNames::SIGCHECK)?;
    let dumpbin = required("Dumpbin", &overrides.dumpbin, ToolNames::DUMPBIN)?;

    let resedit = find_executable(overrides.resedit.as_deref().unwrap_or(ToolNames::RESEDIT));
    let resedit = if resedit.is_file() {
        Some(resedit)
    } else {
        warn!(
            "Resedit tool not found in '{}', embedded resources will not be compared",
            resedit.display()
        );
        None
    };

    Ok(ToolPaths {
        sed,
        diff,
        sigcheck,
        dumpbin,
        resedit,
    })
}
