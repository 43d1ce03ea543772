//! CLI command handler: diff two trees, or dump one.

use anyhow::Result;
use log::debug;
use std::io::{self, BufWriter};
use std::sync::Arc;

use crate::compare::ComparatorRegistry;
use crate::engine::arg_parser::{Cli, Mode, USAGE, parse_invocation};
use crate::engine::tools::resolve_tools;
use crate::utils::{BuildvalToml, apply_file_to_opts, load_config_file, setup_logging};
use crate::{Opts, dump_dir, validate_dirs};

/// Defaults, then the config file, then CLI flags. Excludes from all sources are merged.
fn setup_opts(cli: &Cli, file: Option<&BuildvalToml>, positional_exclude: Option<&str>) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    if let Some(list) = positional_exclude {
        opts.exclude.push(list.to_string());
    }
    opts.exclude.extend(cli.exclude.iter().cloned());
    if let Some(jobs) = cli.jobs {
        opts.parallelism = Some(jobs);
    }
    if let Some(v) = cli.follow_links {
        opts.follow_links = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    opts
}

/// Run diff or dump mode. Bad positional arguments print usage; a missing required tool prints
/// the error. Neither is a failure exit.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let Some(invocation) = parse_invocation(&cli.args) else {
        println!("{USAGE}");
        return Ok(());
    };

    let file = load_config_file(cli.config.as_deref())?;
    let opts = setup_opts(cli, file.as_ref(), invocation.exclude.as_deref());
    setup_logging(opts.verbose);

    let overrides = file.as_ref().map(|f| f.tools().clone()).unwrap_or_default();
    let tools = match resolve_tools(&overrides) {
        Ok(tools) => tools,
        Err(err) => {
            println!("Error: {err}");
            return Ok(());
        }
    };
    debug!("tools: {:?}", tools);
    let registry = Arc::new(ComparatorRegistry::standard(&tools));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match &invocation.mode {
        Mode::Diff { old, new } => {
            let orphans = validate_dirs(old, new, &opts, registry, &mut out)?;
            debug!("{} orphaned old files", orphans.len());
        }
        Mode::Dump { root } => dump_dir(root, &opts, registry, &mut out)?,
    }
    Ok(())
}
