use buildval::command::decode_text;
use buildval::compare::sort_imports;
use buildval::engine::tools::compile_excludes;
use buildval::engine::{
    ExcludeSpec, Invocation, Mode, glob_match, is_excluded, parse_exclude_list, parse_invocation,
    path_relative_to,
};
use buildval::processor::strip_prefix_ignore_case;
use buildval::utils::{apply_file_to_opts, parse_config};
use buildval::{MatchLevel, Opts, Substitution};
use std::ffi::OsStr;
use std::path::PathBuf;

// --- path_relative_to ---

#[test]
fn test_path_relative_under_base() {
    let base = PathBuf::from("/foo/bar");
    let path = PathBuf::from("/foo/bar/baz/qux");
    assert_eq!(
        path_relative_to(&path, &base),
        Some(PathBuf::from("baz/qux"))
    );
}

#[test]
fn test_path_relative_not_under_base() {
    let base = PathBuf::from("/foo/bar");
    let path = PathBuf::from("/other/qux");
    assert_eq!(path_relative_to(&path, &base), None);
}

#[test]
fn test_path_relative_path_equals_base() {
    let base = PathBuf::from("/foo/bar");
    let path = PathBuf::from("/foo/bar");
    assert_eq!(path_relative_to(&path, &base), Some(PathBuf::new()));
}

// --- glob_match / ExcludeSpec ---

#[test]
fn test_glob_match_wildcards() {
    assert!(glob_match("*.log", "build.log"));
    assert!(glob_match("file?.txt", "file1.txt"));
    assert!(!glob_match("file?.txt", "file12.txt"));
    assert!(glob_match("*", ""));
    assert!(glob_match("a*b*c", "aXXbYYc"));
    assert!(!glob_match("a*b*c", "aXXbYY"));
}

#[test]
fn test_glob_match_dot_is_literal() {
    assert!(!glob_match("*.log", "buildxlog"));
    assert!(glob_match("*.log", ".log"));
}

#[test]
fn test_glob_match_is_case_sensitive() {
    assert!(!glob_match("*.LOG", "build.log"));
}

#[test]
fn test_exclude_spec_ignores_case() {
    let spec = ExcludeSpec::new("*.PDB");
    assert!(spec.matches("driver.pdb"));
    assert!(spec.matches("DRIVER.Pdb"));
    assert!(!spec.matches("driver.pdb.bak"));
    assert_eq!(spec.as_str(), "*.PDB");
}

#[test]
fn test_parse_exclude_list_splits_on_both_separators() {
    let specs = parse_exclude_list("*.log;*.pdb, thumbs.db;;");
    let names: Vec<&str> = specs.iter().map(ExcludeSpec::as_str).collect();
    assert_eq!(names, vec!["*.log", "*.pdb", "thumbs.db"]);
}

#[test]
fn test_is_excluded_checks_name_only() {
    let specs = compile_excludes(&["*.log".to_string(), "obj?".to_string()]);
    assert!(is_excluded(OsStr::new("Build.LOG"), &specs));
    assert!(is_excluded(OsStr::new("obj1"), &specs));
    assert!(!is_excluded(OsStr::new("driver.sys"), &specs));
    assert!(!is_excluded(OsStr::new("anything"), &[]));
}

// --- parse_invocation ---

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_parse_invocation_diff_mode() {
    assert_eq!(
        parse_invocation(&args(&["old", "new"])),
        Some(Invocation {
            mode: Mode::Diff {
                old: PathBuf::from("old"),
                new: PathBuf::from("new"),
            },
            exclude: None,
        })
    );
}

#[test]
fn test_parse_invocation_dump_mode_with_exclude() {
    assert_eq!(
        parse_invocation(&args(&["/exclude:*.log;*.pdb", "tree"])),
        Some(Invocation {
            mode: Mode::Dump {
                root: PathBuf::from("tree"),
            },
            exclude: Some("*.log;*.pdb".to_string()),
        })
    );
}

#[test]
fn test_parse_invocation_rejects_malformed() {
    assert_eq!(parse_invocation(&[]), None);
    assert_eq!(parse_invocation(&args(&["/exclude:*.log"])), None);
    assert_eq!(parse_invocation(&args(&["a", "b", "c"])), None);
    assert_eq!(parse_invocation(&args(&["a", "/exclude:*.log", "b"])), None);
}

// --- substitutions and match levels ---

#[test]
fn test_default_substitutions_in_priority_order() {
    let from: Vec<String> = Substitution::defaults()
        .into_iter()
        .map(|s| s.from)
        .collect();
    assert_eq!(from, vec!["Win8.1", "Win10", "w8.1", "Wxp", "Wnet", "Wlh"]);
    assert_eq!(Opts::default().substitutions, Substitution::defaults());
}

#[test]
fn test_strip_prefix_ignore_case() {
    assert_eq!(
        strip_prefix_ignore_case("win10/driver.sys", "Win10"),
        Some("/driver.sys")
    );
    assert_eq!(strip_prefix_ignore_case("Win10", "WIN10"), Some(""));
    assert_eq!(strip_prefix_ignore_case("Win8/driver.sys", "Win10"), None);
    assert_eq!(strip_prefix_ignore_case("Wi", "Win10"), None);
}

#[test]
fn test_match_level_notes() {
    assert_eq!(MatchLevel::FullMatch.note(), None);
    assert_eq!(MatchLevel::NoMatch.note(), None);
    assert_eq!(
        MatchLevel::CaseInsensitiveMatch.note(),
        Some("(NOTE: File paths differ in case)")
    );
    assert_eq!(
        MatchLevel::SubstitutionMatch.note(),
        Some("(NOTE: New file has no exact counterpart in old tree, using a substitution)")
    );
}

// --- sort_imports ---

#[test]
fn test_sort_imports_groups_and_sorts() {
    let listing = concat!(
        "    ntoskrnl.exe\n",
        "          KeWaitForSingleObject\n",
        "          ExAllocatePool\n",
        "    HAL.dll\n",
        "          KeStallExecutionProcessor\n",
        "\n",
        "  Summary\n",
        "\n",
        "          1000 .data\n",
    );
    assert_eq!(
        sort_imports(listing),
        "  HAL.DLL: KeStallExecutionProcessor\n  NTOSKRNL.EXE: ExAllocatePool\n  NTOSKRNL.EXE: KeWaitForSingleObject\n"
    );
}

#[test]
fn test_sort_imports_merges_repeated_modules() {
    let listing = "    a.dll\n          Zeta\n    b.dll\n          Beta\n    A.DLL\n          Alpha\n";
    assert_eq!(
        sort_imports(listing),
        "  A.DLL: Alpha\n  A.DLL: Zeta\n  B.DLL: Beta\n"
    );
}

// --- decode_text ---

#[test]
fn test_decode_text_utf8_and_bom() {
    assert_eq!(decode_text(b"plain"), "plain");
    assert_eq!(decode_text(b"\xEF\xBB\xBFwith bom"), "with bom");
}

#[test]
fn test_decode_text_utf16() {
    let le: Vec<u8> = [0xFF, 0xFE, b'H', 0, b'i', 0].to_vec();
    let be: Vec<u8> = [0xFE, 0xFF, 0, b'H', 0, b'i'].to_vec();
    assert_eq!(decode_text(&le), "Hi");
    assert_eq!(decode_text(&be), "Hi");
}

// --- config file ---

#[test]
fn test_config_file_overrides_defaults() {
    let file = parse_config(
        r#"
[settings]
exclude = ["*.log", "*.pdb"]
jobs = 3
follow_links = true

[tools]
sed = "/opt/bin/sed"

[[substitutions]]
from = "Win11"
to = "Win10"
"#,
    )
    .unwrap();
    assert_eq!(file.tools().sed.as_deref(), Some("/opt/bin/sed"));
    assert_eq!(file.tools().diff, None);

    let mut opts = Opts::default();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!(opts.exclude, vec!["*.log", "*.pdb"]);
    assert_eq!(opts.parallelism, Some(3));
    assert!(opts.follow_links);
    assert!(!opts.verbose);
    assert_eq!(opts.substitutions, vec![Substitution::new("Win11", "Win10")]);
}

#[test]
fn test_config_file_empty_keeps_defaults() {
    let file = parse_config("").unwrap();
    let mut opts = Opts::default();
    apply_file_to_opts(&file, &mut opts);
    assert!(opts.exclude.is_empty());
    assert_eq!(opts.parallelism, None);
    assert_eq!(opts.substitutions, Substitution::defaults());
}

#[test]
fn test_config_file_rejects_bad_types() {
    assert!(parse_config("[settings]\njobs = \"many\"\n").is_err());
}
