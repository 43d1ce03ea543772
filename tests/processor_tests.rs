use buildval::compare::{Comparator, ComparatorRegistry};
use buildval::engine::tools::compile_excludes;
use buildval::error::ValidatorError;
use buildval::processor::{
    InFlightLimiter, Job, Processor, SeenFiles, WalkContext, run_processor, walk_files,
};
use buildval::{Opts, Result, dump_dir, validate_dirs};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn touch(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn ctx(parallelism: usize, excludes: &[&str]) -> WalkContext {
    let excludes: Vec<String> = excludes.iter().map(|s| s.to_string()).collect();
    WalkContext {
        excludes: compile_excludes(&excludes),
        follow_links: false,
        parallelism,
        show_progress: false,
    }
}

fn opts(parallelism: usize, exclude: &[&str]) -> Opts {
    Opts {
        exclude: exclude.iter().map(|s| s.to_string()).collect(),
        parallelism: Some(parallelism),
        ..Opts::default()
    }
}

/// Line diff of the raw contents; dump is the contents.
struct ContentComparator;

impl Comparator for ContentComparator {
    fn compare(&self, old: &Path, new: &Path) -> Result<String> {
        let old = fs::read_to_string(old)?;
        let new = fs::read_to_string(new)?;
        if old == new {
            return Ok(String::new());
        }
        Ok(format!("< {}\n> {}", old.trim_end(), new.trim_end()))
    }

    fn dump(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }
}

fn registry() -> Arc<ComparatorRegistry> {
    let cmp: Arc<dyn Comparator> = Arc::new(ContentComparator);
    Arc::new(
        ComparatorRegistry::empty()
            .with("sys", Arc::clone(&cmp))
            .with("inf", Arc::clone(&cmp))
            .with("dll", cmp),
    )
}

fn run_diff(old: &Path, new: &Path, opts: &Opts) -> (String, Vec<PathBuf>) {
    let mut out = Vec::new();
    let orphans = validate_dirs(old, new, opts, registry(), &mut out).unwrap();
    (String::from_utf8(out).unwrap(), orphans)
}

// --- walk ---

#[test]
fn test_walk_files_first_then_sorted_dirs() {
    let root = tempfile::tempdir().unwrap();
    touch(root.path(), "b/inner.txt", "");
    touch(root.path(), "z.txt", "");
    touch(root.path(), "a/deep/x.txt", "");
    touch(root.path(), "a/y.txt", "");
    touch(root.path(), "m.txt", "");
    touch(root.path(), "skip.log", "");

    let ctx = ctx(1, &["*.LOG"]);
    let rel: Vec<PathBuf> = walk_files(root.path(), &ctx)
        .map(|p| p.unwrap().strip_prefix(root.path()).unwrap().to_path_buf())
        .collect();
    let expected: Vec<PathBuf> = ["m.txt", "z.txt", "a/y.txt", "a/deep/x.txt", "b/inner.txt"]
        .iter()
        .map(PathBuf::from)
        .collect();
    assert_eq!(rel, expected);
}

// --- limiter ---

#[test]
fn test_limiter_releases_on_drop() {
    let limiter = InFlightLimiter::new(2);
    assert_eq!(limiter.capacity(), 2);
    let a = limiter.acquire().unwrap();
    let _b = limiter.acquire().unwrap();
    assert_eq!(limiter.in_flight(), 2);
    drop(a);
    assert_eq!(limiter.in_flight(), 1);
    let _c = limiter.acquire().unwrap();
    assert_eq!(limiter.in_flight(), 2);
}

#[test]
fn test_limiter_zero_capacity_means_one() {
    let limiter = InFlightLimiter::new(0);
    assert_eq!(limiter.capacity(), 1);
    drop(limiter.acquire().unwrap());
    assert_eq!(limiter.in_flight(), 0);
}

// --- run_processor ---

/// Records peak concurrency; later files finish sooner so completion order differs from
/// creation order.
struct Tracker {
    root: PathBuf,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
    created: AtomicUsize,
    fail_on: Option<&'static str>,
    refuse_on: Option<&'static str>,
}

impl Tracker {
    fn new(root: &Path) -> Self {
        Tracker {
            root: root.to_path_buf(),
            active: Arc::default(),
            peak: Arc::default(),
            finished: Arc::default(),
            created: AtomicUsize::new(0),
            fail_on: None,
            refuse_on: None,
        }
    }
}

impl Processor for Tracker {
    fn root(&self) -> &Path {
        &self.root
    }

    fn task(&self, file: &Path, _seen: &SeenFiles) -> Result<Job> {
        let name = file.file_name().unwrap().to_string_lossy().into_owned();
        if self.refuse_on == Some(name.as_str()) {
            anyhow::bail!("cannot prepare {name}");
        }
        let index = self.created.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_on == Some(name.as_str());
        let active = Arc::clone(&self.active);
        let peak = Arc::clone(&self.peak);
        let finished = Arc::clone(&self.finished);
        Ok(Box::new(move || -> Result<String> {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(40u64.saturating_sub(index as u64 * 4)));
            active.fetch_sub(1, Ordering::SeqCst);
            finished.fetch_add(1, Ordering::SeqCst);
            if fail {
                anyhow::bail!("unit for {name} failed");
            }
            Ok(name)
        }))
    }
}

fn numbered_tree(count: usize) -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    for i in 0..count {
        touch(root.path(), &format!("f{i:02}.txt"), "");
    }
    root
}

#[test]
fn test_in_flight_never_exceeds_parallelism() {
    let root = numbered_tree(10);
    let tracker = Tracker::new(root.path());
    let mut out = Vec::new();
    run_processor(&tracker, &ctx(3, &[]), &mut out).unwrap();
    let peak = tracker.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak {peak} exceeded 3");
    assert!(peak >= 1);
    assert_eq!(tracker.finished.load(Ordering::SeqCst), 10);
}

#[test]
fn test_parallelism_one_is_serial() {
    let root = numbered_tree(5);
    let tracker = Tracker::new(root.path());
    let mut out = Vec::new();
    run_processor(&tracker, &ctx(1, &[]), &mut out).unwrap();
    assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
}

#[test]
fn test_results_written_in_creation_order() {
    let root = numbered_tree(8);
    let tracker = Tracker::new(root.path());
    let mut out = Vec::new();
    run_processor(&tracker, &ctx(8, &[]), &mut out).unwrap();
    let expected: String = (0..8).map(|i| format!("f{i:02}.txt\n")).collect();
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_unit_error_aborts_after_joining_all() {
    let root = numbered_tree(6);
    let mut tracker = Tracker::new(root.path());
    tracker.fail_on = Some("f02.txt");
    let mut out = Vec::new();
    let err = run_processor(&tracker, &ctx(2, &[]), &mut out).unwrap_err();
    assert!(format!("{err:#}").contains("unit for f02.txt failed"));
    assert_eq!(tracker.finished.load(Ordering::SeqCst), 6);
    assert_eq!(String::from_utf8(out).unwrap(), "f00.txt\nf01.txt\n");
}

#[test]
fn test_task_error_writes_nothing() {
    let root = numbered_tree(6);
    let mut tracker = Tracker::new(root.path());
    tracker.refuse_on = Some("f04.txt");
    let mut out = Vec::new();
    let err = run_processor(&tracker, &ctx(2, &[]), &mut out).unwrap_err();
    assert!(format!("{err:#}").contains("cannot prepare f04.txt"));
    assert_eq!(tracker.created.load(Ordering::SeqCst), 4);
    assert_eq!(tracker.finished.load(Ordering::SeqCst), 4);
    assert!(out.is_empty(), "unexpected output: {:?}", String::from_utf8_lossy(&out));
}

struct Panicking(PathBuf);

impl Processor for Panicking {
    fn root(&self) -> &Path {
        &self.0
    }

    fn task(&self, _file: &Path, _seen: &SeenFiles) -> Result<Job> {
        Ok(Box::new(|| -> Result<String> { panic!("unit blew up") }))
    }
}

#[test]
fn test_panicking_unit_is_worker_error() {
    let root = numbered_tree(2);
    let mut out = Vec::new();
    let err = run_processor(&Panicking(root.path().to_path_buf()), &ctx(2, &[]), &mut out)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ValidatorError>(),
        Some(ValidatorError::Worker(_))
    ));
}

#[test]
fn test_seen_files_ignore_case() {
    let seen = SeenFiles::default();
    assert!(seen.is_empty());
    seen.insert(Path::new("/Old/Driver.SYS"));
    seen.insert(Path::new("/old/driver.sys"));
    assert_eq!(seen.len(), 1);
    assert!(seen.contains(Path::new("/OLD/DRIVER.sys")));
    assert!(!seen.contains(Path::new("/old/other.sys")));
}

// --- diff mode ---

#[test]
fn test_identical_trees_produce_no_output() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    for dir in [old.path(), new.path()] {
        touch(dir, "driver.sys", "same");
        touch(dir, "sub/driver.inf", "same inf");
        touch(dir, "readme.txt", "unregistered type");
    }
    let (out, orphans) = run_diff(old.path(), new.path(), &opts(4, &[]));
    assert_eq!(out, "");
    assert!(orphans.is_empty());
}

#[test]
fn test_changed_file_gets_diff_block() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    let old_file = touch(old.path(), "driver.sys", "v1");
    let new_file = touch(new.path(), "driver.sys", "v2");

    let (out, _) = run_diff(old.path(), new.path(), &opts(2, &[]));
    assert_eq!(
        out,
        format!(
            "Diff {} vs {}:\n< v1\n> v2\n\n",
            old_file.display(),
            new_file.display()
        )
    );
}

#[test]
fn test_substitution_match_reports_note_without_diff() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    let old_file = touch(old.path(), "Win8/driver.sys", "same");
    let new_file = touch(new.path(), "Win10/driver.sys", "same");

    let (out, orphans) = run_diff(old.path(), new.path(), &opts(2, &[]));
    assert_eq!(
        out,
        format!(
            "Diff {} vs {}:\n(NOTE: New file has no exact counterpart in old tree, using a substitution)\n\n\n",
            old_file.display(),
            new_file.display()
        )
    );
    assert!(orphans.is_empty());
}

#[test]
fn test_case_difference_reports_note() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    touch(old.path(), "Driver.INF", "same");
    touch(new.path(), "driver.inf", "same");

    let (out, orphans) = run_diff(old.path(), new.path(), &opts(2, &[]));
    assert!(out.contains("(NOTE: File paths differ in case)"));
    assert!(out.contains("Driver.INF vs "));
    assert!(orphans.is_empty());
}

#[test]
fn test_new_file_without_counterpart() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    let added = touch(new.path(), "added.sys", "x");

    let (out, _) = run_diff(old.path(), new.path(), &opts(2, &[]));
    assert_eq!(
        out,
        format!("New file without old counterpart: {}\n\n", added.display())
    );
}

#[test]
fn test_old_file_shadowing_new_directory_is_not_fatal() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    let old_file = touch(old.path(), "a", "plain file");
    let new_file = touch(new.path(), "a/x.txt", "nested");

    let (out, orphans) = run_diff(old.path(), new.path(), &opts(2, &[]));
    assert_eq!(
        out,
        format!(
            "New file without old counterpart: {}\n\nOld file without new counterpart: {}\n\n",
            new_file.display(),
            old_file.display()
        )
    );
    assert_eq!(orphans, vec![old_file]);
}

#[test]
fn test_orphan_reported_exactly_once_after_diffs() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    touch(old.path(), "a/driver.sys", "v1");
    touch(new.path(), "a/driver.sys", "v2");
    let unused = touch(old.path(), "b/unused.dll", "gone");

    let (out, orphans) = run_diff(old.path(), new.path(), &opts(2, &[]));
    let line = format!("Old file without new counterpart: {}", unused.display());
    assert_eq!(out.matches(&line).count(), 1);
    assert!(out.ends_with(&format!("{line}\n\n")));
    assert!(out.find("Diff ").unwrap() < out.find(&line).unwrap());
    assert_eq!(orphans, vec![unused]);
}

#[test]
fn test_excluded_files_never_reported() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    touch(old.path(), "old-only.log", "x");
    touch(new.path(), "new-only.LOG", "y");
    touch(old.path(), "sub/both.log", "1");
    touch(new.path(), "sub/both.log", "2");

    let (out, orphans) = run_diff(old.path(), new.path(), &opts(2, &["*.log"]));
    assert_eq!(out, "");
    assert!(orphans.is_empty());

    let mut dump = Vec::new();
    dump_dir(new.path(), &opts(2, &["*.log"]), registry(), &mut dump).unwrap();
    assert!(dump.is_empty());
}

#[test]
fn test_missing_root_is_an_error() {
    let old = tempfile::tempdir().unwrap();
    let missing = old.path().join("missing");
    let mut out = Vec::new();
    assert!(validate_dirs(old.path(), &missing, &opts(1, &[]), registry(), &mut out).is_err());
}

// --- dump mode ---

#[test]
fn test_dump_lists_registered_types() {
    let root = tempfile::tempdir().unwrap();
    let inf = touch(root.path(), "driver.inf", "[Version]");
    touch(root.path(), "notes.txt", "not dumped");

    let mut out = Vec::new();
    dump_dir(root.path(), &opts(2, &[]), registry(), &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("Dump of {}:\n[Version]\n\n", inf.display())
    );
}

#[test]
fn test_dump_twice_is_identical() {
    let root = tempfile::tempdir().unwrap();
    for i in 0..12 {
        touch(root.path(), &format!("d{}/f{i}.sys", i % 3), &format!("body {i}"));
    }
    let mut first = Vec::new();
    let mut second = Vec::new();
    dump_dir(root.path(), &opts(4, &[]), registry(), &mut first).unwrap();
    dump_dir(root.path(), &opts(4, &[]), registry(), &mut second).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
