//! Job execution
//!
//! Each job runs on its own background thread; this module holds the
//! synchronous body of that thread. Every failure path collapses into a
//! [`JobOutcome::Failed`] so the scheduler's queue-advance logic is never
//! stalled by a broken job.

use crate::job::{Job, JobOutcome, RemoveJob, SyncJob};
use crate::runner::Runner;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-tree ignore file excluded from every transfer
pub const IGNORE_FILE: &str = ".mirrorignore";

/// Suffix the mirroring tool gives files while they are in transfer
pub const PARTIAL_SUFFIX: &str = ".partial";

/// In-flight-rename sibling of `path` (`a.txt` -> `a.txt.partial`)
pub(crate) fn partial_name(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Execute one job synchronously; always returns an outcome
pub(crate) fn execute(job: &Job, runner: &dyn Runner, tool: &str) -> JobOutcome {
    match job {
        Job::Sync(j) => run_sync(j, runner, tool),
        Job::Remove(j) => run_remove(j),
    }
}

/// Build the tool's argument vector for a sync job.
///
/// The flag set is deterministic for a given job: times are always
/// preserved, directories recurse, `delete` switches between removing
/// source files and skipping newer destination files, and the ignore-file
/// filter is always applied.
pub(crate) fn build_sync_argv(job: &SyncJob, tool: &str) -> Vec<OsString> {
    let mut argv: Vec<OsString> = vec![tool.into(), "--times".into()];

    if job.source.is_dir() {
        argv.push("--recursive".into());
    }
    if job.flags.delete {
        argv.push("--remove-source-files".into());
    } else {
        argv.push("--update".into());
    }
    if job.flags.verbose {
        argv.push("--verbose".into());
    }
    argv.push(format!("--filter=:- {IGNORE_FILE}").into());
    if let Some(rights) = &job.flags.rights {
        argv.push(format!("--chmod={rights}").into());
    }

    argv.push(job.source.as_os_str().to_owned());
    argv.push(job.target.as_os_str().to_owned());
    argv
}

fn run_sync(job: &SyncJob, runner: &dyn Runner, tool: &str) -> JobOutcome {
    let argv = build_sync_argv(job, tool);
    tracing::debug!(
        "syncing {} -> {}",
        job.source.display(),
        job.target.display()
    );

    match runner.run(&argv) {
        Ok(0) => {
            if job.flags.delete && job.source.is_dir() {
                prune_empty_dirs(&job.source);
            }
            JobOutcome::Success
        }
        Ok(code) => JobOutcome::Failed(format!("{tool} exited with code {code}")),
        Err(e) => JobOutcome::Failed(e.to_string()),
    }
}

/// Remove now-empty directories bottom-up starting at `root`.
///
/// Only directories verified empty are removed, so a branch holding any
/// non-directory leftover keeps itself and all its ancestors.
fn prune_empty_dirs(root: &Path) {
    let walker = WalkDir::new(root).contents_first(true).into_iter();
    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let is_empty = fs::read_dir(entry.path())
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if is_empty {
            if let Err(e) = fs::remove_dir(entry.path()) {
                tracing::debug!("could not prune {}: {}", entry.path().display(), e);
            }
        }
    }
}

fn run_remove(job: &RemoveJob) -> JobOutcome {
    let mut errors = Vec::new();

    for path in &job.files {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            // Gone already (possibly finished transferring under its final
            // name): nothing to do.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                errors.push(format!("{}: {}", path.display(), e));
                continue;
            }
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        if let Err(e) = result {
            tracing::error!("failed to remove {}: {}", path.display(), e);
            errors.push(format!("{}: {}", path.display(), e));
        }
    }

    if errors.is_empty() {
        JobOutcome::Success
    } else {
        JobOutcome::Failed(errors.join("; "))
    }
}
