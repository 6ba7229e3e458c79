//! # MirrorQ - Keyed Synchronization Scheduler
//!
//! MirrorQ serializes invocations of an external file-mirroring tool so that
//! at most one operation is ever in flight for a given `(source, target)`
//! pair, while unrelated pairs run concurrently on their own threads.
//!
//! ## Model
//!
//! - Every submission resolves to a [`ResourceKey`]; jobs sharing a key
//!   execute strictly FIFO, one at a time.
//! - A submission identical to one already queued (but not yet started) for
//!   the same key is collapsed into it.
//! - Once a key's queue drains and its worker finishes, the key's state is
//!   evicted.
//! - Submissions are non-blocking by default; `wait = true` or the global
//!   `force_sync` switch blocks the caller until the job's outcome arrives.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mirrorq::{Scheduler, SchedulerConfig, SyncFlags};
//! use std::path::Path;
//!
//! let scheduler = Scheduler::with_default_runner(SchedulerConfig::default()).unwrap();
//!
//! // Fire and forget: returns once the job is scheduled.
//! scheduler.sync(
//!     Path::new("/data/raw/run1"),
//!     Path::new("/archive/run1"),
//!     SyncFlags::default(),
//!     false,
//!     None,
//! ).unwrap();
//!
//! // Blocking: propagates the worker's outcome.
//! scheduler.sync(
//!     Path::new("/data/raw/run2"),
//!     Path::new("/archive/run2"),
//!     SyncFlags { delete: true, ..SyncFlags::default() },
//!     true,
//!     None,
//! ).unwrap();
//! ```
//!
//! ## Testing scheduler logic
//!
//! The external tool sits behind the [`Runner`] trait, so queueing and
//! mutual-exclusion behavior can be exercised with a fake runner instead of
//! real subprocesses.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod job;
mod probe;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod worker;

// Re-export commonly used types
pub use aggregate::CallbackAggregator;
pub use config::{MissingDirPolicy, SchedulerConfig};
pub use error::{MirrorError, Result};
pub use job::{CompletionCallback, Job, JobOutcome, RemoveJob, ResourceKey, SyncFlags, SyncJob};
pub use queue::KeyedJobQueue;
pub use runner::{detect_tool, MirrorRunner, Runner, ToolStatus};
pub use scheduler::Scheduler;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
