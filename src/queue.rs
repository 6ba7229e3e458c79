//! Per-key FIFO with duplicate suppression
//!
//! Each resource key owns one [`KeyedJobQueue`] holding the jobs that have
//! been submitted but not yet started. A submission identical (by
//! [`crate::job::JobIdentity`]) to one already queued is not re-enqueued;
//! its completion hooks are merged onto the surviving entry instead, so
//! blocking callers and aggregators attached to the duplicate still fire.
//!
//! Dedup covers queued jobs only. Once a job is popped its identity is
//! cleared, and an identical resubmission queues again behind the in-flight
//! one: at most one concurrent execution, not at most one ever.

use crate::job::{CompletionCallback, Job, JobIdentity, JobOutcome};
use crossbeam::channel::Sender;
use std::collections::{HashSet, VecDeque};

/// One-shot completion notification attached to a queued job
pub(crate) enum CompletionHook {
    /// User callback invoked on the worker thread
    Callback(CompletionCallback),
    /// Channel a blocking caller is waiting on
    Waiter(Sender<JobOutcome>),
}

impl CompletionHook {
    /// Deliver the outcome, consuming the hook
    pub(crate) fn fire(self, outcome: &JobOutcome) {
        match self {
            CompletionHook::Callback(cb) => cb(outcome),
            CompletionHook::Waiter(tx) => {
                let _ = tx.send(outcome.clone());
            }
        }
    }
}

/// A job waiting in a queue together with its completion hooks
pub(crate) struct QueuedJob {
    pub(crate) job: Job,
    pub(crate) identity: JobIdentity,
    pub(crate) hooks: Vec<CompletionHook>,
}

/// FIFO of not-yet-started jobs for a single resource key
#[derive(Default)]
pub struct KeyedJobQueue {
    jobs: VecDeque<QueuedJob>,
    identities: HashSet<JobIdentity>,
}

impl KeyedJobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job unless an identical one is already queued.
    ///
    /// Returns `true` if the job was enqueued, `false` if it was suppressed
    /// as a duplicate (its hooks are merged onto the queued entry).
    pub(crate) fn put(&mut self, job: Job, hooks: Vec<CompletionHook>) -> bool {
        let identity = job.identity();
        if self.identities.contains(&identity) {
            if let Some(existing) = self.jobs.iter_mut().find(|q| q.identity == identity) {
                existing.hooks.extend(hooks);
            }
            tracing::debug!("suppressed duplicate queued job");
            return false;
        }

        self.identities.insert(identity.clone());
        self.jobs.push_back(QueuedJob {
            job,
            identity,
            hooks,
        });
        true
    }

    /// Remove and return the oldest job, clearing its identity
    pub(crate) fn pop(&mut self) -> Option<QueuedJob> {
        let queued = self.jobs.pop_front()?;
        self.identities.remove(&queued.identity);
        Some(queued)
    }

    /// True iff no pending jobs remain. Does not consider an in-flight worker.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of pending jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}
