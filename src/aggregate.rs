//! Fan-in completion aggregation
//!
//! Collapses the completions of N constituent jobs into one downstream
//! callback, fired exactly once when the last constituent reports in. Built
//! per batch; an aggregator that has fired stays inert.

use crate::job::{CompletionCallback, JobOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Collapses N job completions into a single downstream callback
pub struct CallbackAggregator {
    remaining: AtomicUsize,
    failures: AtomicUsize,
    first_failure: Mutex<Option<String>>,
    callback: Mutex<Option<CompletionCallback>>,
}

impl CallbackAggregator {
    /// Create an aggregator over `n` constituent jobs.
    ///
    /// With `n == 0` the callback fires immediately with a success outcome.
    pub fn new(n: usize, callback: CompletionCallback) -> Arc<Self> {
        let aggregator = Arc::new(Self {
            remaining: AtomicUsize::new(n),
            failures: AtomicUsize::new(0),
            first_failure: Mutex::new(None),
            callback: Mutex::new(Some(callback)),
        });
        if n == 0 {
            aggregator.finish();
        }
        aggregator
    }

    /// Record one constituent completion; fires the final callback when the
    /// count reaches the batch size.
    pub fn notify(&self, outcome: &JobOutcome) {
        if let JobOutcome::Failed(msg) = outcome {
            self.failures.fetch_add(1, Ordering::SeqCst);
            let mut first = self.first_failure.lock().unwrap();
            if first.is_none() {
                *first = Some(msg.clone());
            }
        }

        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.finish();
        }
    }

    /// Adapter turning this aggregator into a per-job completion callback
    pub fn hook(self: &Arc<Self>) -> CompletionCallback {
        let aggregator = Arc::clone(self);
        Box::new(move |outcome| aggregator.notify(outcome))
    }

    fn finish(&self) {
        let callback = self.callback.lock().unwrap().take();
        if let Some(callback) = callback {
            let failures = self.failures.load(Ordering::SeqCst);
            let outcome = if failures == 0 {
                JobOutcome::Success
            } else {
                let first = self
                    .first_failure
                    .lock()
                    .unwrap()
                    .take()
                    .unwrap_or_else(|| "unknown failure".to_string());
                JobOutcome::Failed(format!("{failures} job(s) in batch failed; first: {first}"))
            };
            callback(&outcome);
        }
    }
}
