//! Job and resource-key definitions
//!
//! A [`Job`] is an immutable unit of work: one external mirroring invocation
//! or one batch of deletions. Jobs carry an identity used for duplicate
//! suppression while queued; callbacks are deliberately not part of it.

use crate::error::{MirrorError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Normalize a path by reassembling its components. Strips trailing
/// separators so `/a/b/` and `/a/b` produce the same key.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

/// The serialization domain for jobs: a normalized `(source, target)` pair.
///
/// Jobs sharing a key never execute concurrently; distinct keys are
/// independent. Remove jobs use `(dir, None)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    source: PathBuf,
    target: Option<PathBuf>,
}

impl ResourceKey {
    /// Build a key from raw paths, normalizing both sides
    pub fn new(source: &Path, target: Option<&Path>) -> Self {
        Self {
            source: normalize(source),
            target: target.map(normalize),
        }
    }

    /// Source side of the key
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Target side of the key, if any
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }
}

/// Flags controlling one mirroring invocation.
///
/// Part of the sync job's identity: two submissions for the same pair with
/// different flags are distinct jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SyncFlags {
    /// Pass the tool's verbose flag
    pub verbose: bool,
    /// Remove source files after a successful transfer, then prune empty
    /// source directories. When unset, files newer at the destination are
    /// skipped instead.
    pub delete: bool,
    /// Permission spec forwarded to the tool's chmod flag
    pub rights: Option<String>,
}

/// One mirroring invocation: copy `source` to `target` under `flags`
#[derive(Debug, Clone)]
pub struct SyncJob {
    /// Source path (normalized)
    pub source: PathBuf,
    /// Target path (normalized)
    pub target: PathBuf,
    /// Invocation flags
    pub flags: SyncFlags,
}

impl SyncJob {
    /// Create a sync job, normalizing both paths
    pub fn new(source: &Path, target: &Path, flags: SyncFlags) -> Self {
        Self {
            source: normalize(source),
            target: normalize(target),
            flags,
        }
    }
}

/// One deletion batch: remove `files` that live under `dir`
#[derive(Debug, Clone)]
pub struct RemoveJob {
    /// Directory the files belong to (the key's source side)
    pub dir: PathBuf,
    /// Absolute paths to delete; missing members are skipped
    pub files: BTreeSet<PathBuf>,
}

impl RemoveJob {
    /// Create a remove job, normalizing the directory and every member
    pub fn new(dir: &Path, files: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dir: normalize(dir),
            files: files.into_iter().map(|f| normalize(&f)).collect(),
        }
    }
}

/// A unit of work the scheduler can queue and execute
#[derive(Debug, Clone)]
pub enum Job {
    /// External mirroring invocation
    Sync(SyncJob),
    /// Filesystem deletion batch
    Remove(RemoveJob),
}

/// Coarse job kind, recorded while a worker is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobKind {
    Sync,
    Remove,
}

/// Identity used for duplicate suppression among queued jobs.
///
/// Callbacks are excluded: two submissions that differ only in their
/// callbacks are the same job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobIdentity {
    /// Sync identity: `(source, target, flags)`
    Sync {
        /// Normalized source path
        source: PathBuf,
        /// Normalized target path
        target: PathBuf,
        /// Invocation flags
        flags: SyncFlags,
    },
    /// Remove identity: `(dir, files)`
    Remove {
        /// Normalized directory
        dir: PathBuf,
        /// Normalized file set
        files: BTreeSet<PathBuf>,
    },
}

impl Job {
    /// Identity for duplicate suppression
    pub fn identity(&self) -> JobIdentity {
        match self {
            Job::Sync(j) => JobIdentity::Sync {
                source: j.source.clone(),
                target: j.target.clone(),
                flags: j.flags.clone(),
            },
            Job::Remove(j) => JobIdentity::Remove {
                dir: j.dir.clone(),
                files: j.files.clone(),
            },
        }
    }

    /// Resource key this job serializes on
    pub fn key(&self) -> ResourceKey {
        match self {
            Job::Sync(j) => ResourceKey::new(&j.source, Some(&j.target)),
            Job::Remove(j) => ResourceKey::new(&j.dir, None),
        }
    }

    pub(crate) fn kind(&self) -> JobKind {
        match self {
            Job::Sync(_) => JobKind::Sync,
            Job::Remove(_) => JobKind::Remove,
        }
    }
}

/// Completion result of one executed job, delivered to every hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job ran to completion
    Success,
    /// The job failed; carries the worker's report
    Failed(String),
}

impl JobOutcome {
    /// True when the job ran to completion
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }

    /// Convert into a [`Result`], mapping failure to [`MirrorError::JobFailed`]
    pub fn into_result(self) -> Result<()> {
        match self {
            JobOutcome::Success => Ok(()),
            JobOutcome::Failed(msg) => Err(MirrorError::JobFailed(msg)),
        }
    }
}

/// One-shot completion callback attached to a submission
pub type CompletionCallback = Box<dyn FnOnce(&JobOutcome) + Send + 'static>;
