//! Bounded sequential work pipeline.
//!
//! # Responsibility
//! - Run one job per input item, strictly one at a time.
//! - Report progress after every completed job.
//! - Stop taking new items once the cancel flag is raised.
//!
//! # Invariants
//! - At most one job is in flight; job `i + 1` starts after job `i` returned.
//! - Items are processed in input order.
//! - Cancellation never interrupts a running job; remaining items are skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation shared between the caller and a running pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    requested: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the pipeline to stop before its next item.
    pub fn cancel(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Progress snapshot delivered after each completed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineProgress {
    /// Number of completed jobs, 1-based.
    pub current: usize,
    pub total: usize,
}

/// Completed job outputs plus the items never started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome<I, O> {
    pub completed: Vec<O>,
    pub skipped: Vec<I>,
}

/// Queue of capacity one: the next item is admitted only when the previous
/// job has finished.
#[derive(Debug, Clone, Default)]
pub struct SequentialPipeline {
    cancel: Option<CancelFlag>,
}

impl SequentialPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Runs `job` over `items` in order.
    pub fn run<I, O, J, P>(&self, items: Vec<I>, mut job: J, mut on_progress: P) -> PipelineOutcome<I, O>
    where
        J: FnMut(&I) -> O,
        P: FnMut(PipelineProgress),
    {
        let total = items.len();
        let mut completed = Vec::with_capacity(total);
        let mut pending = items.into_iter();

        while let Some(item) = pending.next() {
            if self.cancelled() {
                let mut skipped = vec![item];
                skipped.extend(pending);
                return PipelineOutcome { completed, skipped };
            }
            completed.push(job(&item));
            on_progress(PipelineProgress {
                current: completed.len(),
                total,
            });
        }

        PipelineOutcome {
            completed,
            skipped: Vec::new(),
        }
    }
}
