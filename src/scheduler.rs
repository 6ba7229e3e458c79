//! The keyed synchronization scheduler
//!
//! Process-wide table of resource key -> (queue, active worker). At most one
//! worker executes per key at any instant; independent keys run in parallel
//! on their own threads. Submissions are non-blocking by default: the call
//! returns once the job is queued (and started, if the key was idle).
//! Passing `wait = true`, or enabling the global `force_sync` switch, blocks
//! the caller until that job's outcome arrives and propagates failure.
//!
//! Construct one `Scheduler` at process start and hand references to all
//! call sites; it is the only shared mutable state in this crate.

use crate::aggregate::CallbackAggregator;
use crate::config::{MissingDirPolicy, SchedulerConfig};
use crate::error::{MirrorError, Result};
use crate::job::{
    normalize, CompletionCallback, Job, JobKind, JobOutcome, RemoveJob, ResourceKey, SyncFlags,
    SyncJob,
};
use crate::probe;
use crate::queue::{CompletionHook, KeyedJobQueue, QueuedJob};
use crate::runner::{MirrorRunner, Runner};
use crate::worker;
use crossbeam::channel::{bounded, Receiver};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Per-key scheduling state: pending jobs plus the kind of the worker
/// currently running for the key, if any.
struct QueueEntry {
    queue: KeyedJobQueue,
    active: Option<JobKind>,
}

impl QueueEntry {
    fn new() -> Self {
        Self {
            queue: KeyedJobQueue::new(),
            active: None,
        }
    }
}

struct Inner {
    config: SchedulerConfig,
    runner: Arc<dyn Runner>,
    table: Mutex<HashMap<ResourceKey, QueueEntry>>,
    force_sync: AtomicBool,
}

impl Inner {
    /// Enqueue a job under its key and start a worker if the key is idle.
    /// The dequeue check-and-set happens under the table lock so two workers
    /// can never start for the same key.
    fn submit(self: &Arc<Self>, key: ResourceKey, job: Job, hooks: Vec<CompletionHook>) {
        let to_spawn = {
            let mut table = self.table.lock().unwrap();
            let entry = table.entry(key.clone()).or_insert_with(QueueEntry::new);
            entry.queue.put(job, hooks);
            if entry.active.is_none() {
                let next = entry.queue.pop();
                if let Some(next) = &next {
                    entry.active = Some(next.job.kind());
                }
                next
            } else {
                None
            }
        };

        if let Some(next) = to_spawn {
            self.spawn_worker(key, next);
        }
    }

    /// Called by a finishing worker: start the next queued job for the key,
    /// or evict the key's state when the queue has drained.
    fn advance(self: &Arc<Self>, key: &ResourceKey) {
        let to_spawn = {
            let mut table = self.table.lock().unwrap();
            match table.get_mut(key) {
                Some(entry) => match entry.queue.pop() {
                    Some(next) => {
                        entry.active = Some(next.job.kind());
                        Some(next)
                    }
                    None => {
                        table.remove(key);
                        tracing::debug!("queue drained for {}", key.source().display());
                        None
                    }
                },
                None => None,
            }
        };

        if let Some(next) = to_spawn {
            self.spawn_worker(key.clone(), next);
        }
    }

    /// Run one job on its own thread. The outcome is reported after the
    /// scheduler has advanced the key, so a blocking caller that wakes up
    /// observes the post-drain state.
    fn spawn_worker(self: &Arc<Self>, key: ResourceKey, queued: QueuedJob) {
        let inner = Arc::clone(self);
        thread::spawn(move || {
            let outcome = worker::execute(&queued.job, inner.runner.as_ref(), &inner.config.tool);
            if let JobOutcome::Failed(msg) = &outcome {
                tracing::error!("job for {} failed: {}", key.source().display(), msg);
            }

            inner.advance(&key);

            for hook in queued.hooks {
                hook.fire(&outcome);
            }
        });
    }
}

/// Keyed synchronization scheduler serializing mirroring jobs per
/// `(source, target)` pair.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Create a scheduler with an explicit [`Runner`]
    pub fn new(config: SchedulerConfig, runner: Arc<dyn Runner>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                runner,
                table: Mutex::new(HashMap::new()),
                force_sync: AtomicBool::new(false),
            }),
        }
    }

    /// Create a scheduler backed by the configured external tool,
    /// validating that the tool is installed
    pub fn with_default_runner(config: SchedulerConfig) -> Result<Self> {
        let runner = Arc::new(MirrorRunner::new(&config.tool)?);
        Ok(Self::new(config, runner))
    }

    /// Make every subsequent submission block its caller until the job
    /// completes, regardless of the per-call `wait`/`block` argument
    pub fn set_force_sync(&self, on: bool) {
        self.inner.force_sync.store(on, Ordering::SeqCst);
    }

    /// Current state of the global blocking switch
    pub fn force_sync(&self) -> bool {
        self.inner.force_sync.load(Ordering::SeqCst)
    }

    /// Number of keys with live scheduling state (pending or running)
    pub fn in_flight(&self) -> usize {
        self.inner.table.lock().unwrap().len()
    }

    /// True when no job is pending or running for any key
    pub fn is_idle(&self) -> bool {
        self.inner.table.lock().unwrap().is_empty()
    }

    /// Schedule one mirroring invocation of `source` onto `target`.
    ///
    /// Creates the target's parent directory first; a creation failure is
    /// handled per the configured [`MissingDirPolicy`]. The job is
    /// deduplicated against identical queued jobs for the same key. With
    /// `wait` (or the global `force_sync` switch) the call blocks until this
    /// job completes and returns its outcome as a `Result`.
    pub fn sync(
        &self,
        source: &Path,
        target: &Path,
        flags: SyncFlags,
        wait: bool,
        callback: Option<CompletionCallback>,
    ) -> Result<()> {
        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                match self.inner.config.missing_target_dir {
                    MissingDirPolicy::Fail => {
                        return Err(MirrorError::TargetDir {
                            path: parent.to_path_buf(),
                            source: e,
                        });
                    }
                    MissingDirPolicy::LogAndSkip => {
                        tracing::error!(
                            "cannot create target directory {}: {}; job dropped",
                            parent.display(),
                            e
                        );
                        // Keep fan-in aggregators live even though the job
                        // itself is dropped.
                        if let Some(callback) = callback {
                            callback(&JobOutcome::Failed(format!(
                                "target directory {} could not be created",
                                parent.display()
                            )));
                        }
                        return Ok(());
                    }
                }
            }
        }

        let key = ResourceKey::new(source, Some(target));
        let job = Job::Sync(SyncJob::new(source, target, flags));
        self.submit(key, job, wait, callback)
    }

    /// Schedule one mirroring invocation per `(source, target)` pair.
    ///
    /// Fails before scheduling anything when the slices differ in length.
    /// The callback is wrapped in a [`CallbackAggregator`] and fires exactly
    /// once, after every pair has finished. With `parallel = false` each
    /// pair is awaited before the next is submitted; otherwise all pairs are
    /// dispatched at once (independent keys then run concurrently). `wait`
    /// blocks until the whole batch has finished and propagates the
    /// collapsed outcome.
    pub fn sync_many(
        &self,
        sources: &[PathBuf],
        targets: &[PathBuf],
        flags: SyncFlags,
        wait: bool,
        parallel: bool,
        callback: Option<CompletionCallback>,
    ) -> Result<()> {
        if sources.len() != targets.len() {
            return Err(MirrorError::LengthMismatch {
                sources: sources.len(),
                targets: targets.len(),
            });
        }

        let (done_tx, done_rx) = bounded(1);
        let final_callback: CompletionCallback = Box::new(move |outcome: &JobOutcome| {
            if let Some(callback) = callback {
                callback(outcome);
            }
            let _ = done_tx.send(outcome.clone());
        });
        let aggregator = CallbackAggregator::new(sources.len(), final_callback);

        for (source, target) in sources.iter().zip(targets.iter()) {
            if parallel {
                self.sync(source, target, flags.clone(), false, Some(aggregator.hook()))?;
            } else {
                let (pair_tx, pair_rx) = bounded(1);
                let hook = aggregator.hook();
                let pair_callback: CompletionCallback = Box::new(move |outcome| {
                    hook(outcome);
                    let _ = pair_tx.send(outcome.clone());
                });
                self.sync(source, target, flags.clone(), false, Some(pair_callback))?;
                // Sequential mode: failures are collected by the aggregator
                // rather than aborting the rest of the batch.
                let _ = pair_rx.recv();
            }
        }

        if wait {
            return Self::await_outcome(&done_rx);
        }
        Ok(())
    }

    /// Schedule deletion of `files` under `dir`, keyed on `(dir, None)`.
    ///
    /// When a sync worker for `dir` is currently running, the effective set
    /// is unioned with each file's in-flight-rename equivalent so entries
    /// already renamed mid-transfer are still removed. Missing members are
    /// skipped at removal time. `block` waits for the outcome.
    pub fn remove(
        &self,
        dir: &Path,
        files: BTreeSet<PathBuf>,
        block: bool,
        callback: Option<CompletionCallback>,
    ) -> Result<()> {
        let dir = normalize(dir);
        let mut effective: BTreeSet<PathBuf> = files.iter().map(|f| normalize(f)).collect();

        {
            let table = self.inner.table.lock().unwrap();
            let sync_running = table
                .iter()
                .any(|(key, entry)| key.source() == dir && entry.active == Some(JobKind::Sync));
            if sync_running {
                let partials: Vec<PathBuf> =
                    effective.iter().map(|f| worker::partial_name(f)).collect();
                effective.extend(partials);
            }
        }

        let key = ResourceKey::new(&dir, None);
        let job = Job::Remove(RemoveJob {
            dir,
            files: effective,
        });
        self.submit(key, job, block, callback)
    }

    /// Best-effort probe for a conflicting external invocation already
    /// running for this pair. `timeout` overrides the configured
    /// `probe_timeout_ms` bound when supplied. Degrades to `false` on
    /// timeout or any internal failure; never errors.
    pub fn has_active_sync(
        &self,
        source: &Path,
        target: Option<&Path>,
        timeout: Option<Duration>,
    ) -> bool {
        let timeout = timeout.unwrap_or_else(|| self.inner.config.probe_timeout());
        probe::has_conflicting_process(&self.inner.config.tool, source, target, timeout)
    }

    fn submit(
        &self,
        key: ResourceKey,
        job: Job,
        wait: bool,
        callback: Option<CompletionCallback>,
    ) -> Result<()> {
        let wait = wait || self.force_sync();

        let mut hooks: Vec<CompletionHook> = Vec::new();
        if let Some(callback) = callback {
            hooks.push(CompletionHook::Callback(callback));
        }
        let waiter = if wait {
            let (tx, rx) = bounded(1);
            hooks.push(CompletionHook::Waiter(tx));
            Some(rx)
        } else {
            None
        };

        self.inner.submit(key, job, hooks);

        if let Some(rx) = waiter {
            return Self::await_outcome(&rx);
        }
        Ok(())
    }

    fn await_outcome(rx: &Receiver<JobOutcome>) -> Result<()> {
        match rx.recv() {
            Ok(outcome) => outcome.into_result(),
            Err(_) => Err(MirrorError::WorkerLost),
        }
    }
}
