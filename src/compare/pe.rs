//! PE images (`.sys`, `.dll`, `.exe`): header fields and sorted imports via `dumpbin`, plus
//! embedded resources via `resedit` when it is available.

use anyhow::Context;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{Comparator, Preprocess, PreprocessingComparator};
use crate::command::{FileSink, FileSource, Filter, NullSource, Pipeline, SharedText, TextSink};
use crate::error::ValidatorError;
use crate::utils::config::{ImportListing, PackagePaths};
use crate::{Result, ToolPaths};

const HEADER_FIELDS_SCRIPT: &str = "/machine/p;/characteristics/p;/subsystem/p;/size of image/p";
/// Blank out the RVA column so only module and symbol names remain.
const IMPORT_RVA_SCRIPT: &str = "s/^      *[0-9A-F]+/          /g";
const IMPORT_NOISE_SCRIPT: &str = "/Import Address Table/d;/Import Name Table/d;/time date stamp/d;/Index of first forwarder reference/d";
/// `a,b,c,d` or `a.b.c.d` version quads lose their last component.
const RESOURCE_VERSION_SCRIPT: &str = r"s/\([0-9]*[,\.][0-9]*[,\.][0-9]*[,\.]\)[0-9]*/\10/";

/// Group `dumpbin /IMPORTS` output by module (upper-cased) and sort modules and symbols, one
/// `  MODULE: symbol` line each. Stops at the summary section.
pub fn sort_imports(listing: &str) -> String {
    let mut modules: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;
    for line in listing.lines() {
        if line.starts_with(ImportListing::SUMMARY_MARKER) {
            break;
        }
        if line.starts_with(ImportListing::SYMBOL_INDENT) {
            if let Some(module) = &current {
                modules
                    .entry(module.clone())
                    .or_default()
                    .push(line.trim().to_string());
            }
        } else if line.starts_with(ImportListing::MODULE_INDENT) {
            let module = line.trim().to_uppercase();
            modules.entry(module.clone()).or_default();
            current = Some(module);
        }
    }

    let mut out = String::new();
    for (module, mut symbols) in modules {
        symbols.sort();
        for symbol in symbols {
            out.push_str(&format!("  {module}: {symbol}\n"));
        }
    }
    out
}

pub struct PeHeaderPreprocessor {
    dumpbin: PathBuf,
    sed: PathBuf,
}

impl PeHeaderPreprocessor {
    pub fn new(dumpbin: impl Into<PathBuf>, sed: impl Into<PathBuf>) -> Self {
        PeHeaderPreprocessor {
            dumpbin: dumpbin.into(),
            sed: sed.into(),
        }
    }
}

impl Preprocess for PeHeaderPreprocessor {
    fn preprocess(&self, input: &Path, output: &Path) -> Result<()> {
        let headers = Pipeline::new(NullSource)
            .pipe(Filter::new(&self.dumpbin, [Path::new("/HEADERS"), input]))
            .pipe(Filter::new(&self.sed, ["-n", HEADER_FIELDS_SCRIPT]))
            .pipe(FileSink::new(output));

        let listing = SharedText::default();
        let imports = Pipeline::new(NullSource)
            .pipe(Filter::new(&self.dumpbin, [Path::new("/IMPORTS"), input]))
            .pipe(Filter::new(&self.sed, ["-r", IMPORT_RVA_SCRIPT]))
            .pipe(Filter::new(&self.sed, [IMPORT_NOISE_SCRIPT]))
            .pipe(TextSink::new(listing.clone()));

        headers.wait()?;
        imports.wait()?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(output)
            .map_err(|e| ValidatorError::io(output, e))?;
        file.write_all(sort_imports(&listing.take()).as_bytes())
            .map_err(|e| ValidatorError::io(output, e))?;
        Ok(())
    }
}

/// Decompiles resources with `resedit -convert`, normalizes version quads and appends any
/// manifests the conversion extracted.
pub struct ResourcePreprocessor {
    resedit: PathBuf,
    sed: PathBuf,
}

impl ResourcePreprocessor {
    pub fn new(resedit: impl Into<PathBuf>, sed: impl Into<PathBuf>) -> Self {
        ResourcePreprocessor {
            resedit: resedit.into(),
            sed: sed.into(),
        }
    }
}

impl Preprocess for ResourcePreprocessor {
    fn preprocess(&self, input: &Path, output: &Path) -> Result<()> {
        // resedit only recognizes some PE extensions, so work on a `.exe` copy in a private
        // directory; the directory also keeps its side outputs apart from other units.
        let workdir = tempfile::Builder::new()
            .prefix(PackagePaths::get().temp_prefix())
            .tempdir()
            .context("create resource work dir")?;
        let mut exe_name = input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "image".into());
        exe_name.push(".exe");
        let exe = workdir.path().join(exe_name);
        let rc = exe.with_extension("rc");

        fs::copy(input, &exe).map_err(|e| ValidatorError::io(input, e))?;
        make_writable(&exe)?;

        Pipeline::new(NullSource)
            .pipe(Filter::new(
                &self.resedit,
                [Path::new("-convert"), exe.as_path(), rc.as_path()],
            ))
            .wait()?;

        if !rc.is_file() {
            log::debug!("{}: no resources extracted", input.display());
            return Ok(());
        }

        Pipeline::new(FileSource::new(&rc))
            .pipe(Filter::new(&self.sed, [RESOURCE_VERSION_SCRIPT]))
            .pipe(FileSink::new(output))
            .wait()?;

        append_manifests(workdir.path(), output)
    }
}

fn make_writable(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)
        .map_err(|e| ValidatorError::io(path, e))?
        .permissions();
    if !perms.readonly() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(perms.mode() | 0o200);
    }
    #[cfg(not(unix))]
    perms.set_readonly(false);
    fs::set_permissions(path, perms).map_err(|e| ValidatorError::io(path, e))?;
    Ok(())
}

/// Append every `manifest*.xml` in `dir` (by name) to `output`.
fn append_manifests(dir: &Path, output: &Path) -> Result<()> {
    let mut manifests: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| ValidatorError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .is_some_and(|n| n.starts_with("manifest") && n.ends_with(".xml"))
        })
        .collect();
    manifests.sort();

    let mut out = OpenOptions::new()
        .append(true)
        .create(true)
        .open(output)
        .map_err(|e| ValidatorError::io(output, e))?;
    for manifest in manifests {
        let bytes = fs::read(&manifest).map_err(|e| ValidatorError::io(&manifest, e))?;
        out.write_all(&bytes)
            .map_err(|e| ValidatorError::io(output, e))?;
    }
    Ok(())
}

/// Header comparison always; resource comparison only when `resedit` is configured.
pub struct PeComparator {
    header: PreprocessingComparator<PeHeaderPreprocessor>,
    resources: Option<PreprocessingComparator<ResourcePreprocessor>>,
}

impl PeComparator {
    pub fn new(tools: &ToolPaths) -> Self {
        PeComparator {
            header: PreprocessingComparator::new(
                PeHeaderPreprocessor::new(&tools.dumpbin, &tools.sed),
                &tools.diff,
            ),
            resources: tools.resedit.as_ref().map(|resedit| {
                PreprocessingComparator::new(
                    ResourcePreprocessor::new(resedit, &tools.sed),
                    &tools.diff,
                )
            }),
        }
    }

    fn combine(
        &self,
        labels: (&str, &str),
        header: impl FnOnce(&PreprocessingComparator<PeHeaderPreprocessor>) -> Result<String>,
        resources: impl FnOnce(&PreprocessingComparator<ResourcePreprocessor>) -> Result<String>,
    ) -> Result<String> {
        let mut out = String::new();
        let header_text = header(&self.header)?;
        if !header_text.trim().is_empty() {
            out.push_str(labels.0);
            out.push('\n');
            out.push_str(&header_text);
        }
        if let Some(cmp) = &self.resources {
            let resource_text = resources(cmp)?;
            if !resource_text.trim().is_empty() {
                out.push('\n');
                out.push_str(labels.1);
                out.push('\n');
                out.push_str(&resource_text);
            }
        }
        Ok(out)
    }
}

impl Comparator for PeComparator {
    fn compare(&self, old: &Path, new: &Path) -> Result<String> {
        self.combine(
            ("PE Header diff", "Resource diff"),
            |c| c.compare(old, new),
            |c| c.compare(old, new),
        )
    }

    fn dump(&self, path: &Path) -> Result<String> {
        self.combine(
            ("PE Header dump", "Resource dump"),
            |c| c.dump(path),
            |c| c.dump(path),
        )
    }
}
