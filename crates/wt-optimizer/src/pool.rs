//! Fixed-size worker pool over bounded queues.

use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};
use wt_types::{Candidate, ScoredResult, SweepError};

use crate::evaluator::{Evaluator, OutcomeSource};

/// A candidate tagged with its generation order.
pub type WorkItem = (usize, Candidate);

/// Sizing for the worker pool and its queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
    queue_capacity: usize,
}

impl WorkerPool {
    /// Queues default to twice the worker count.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            queue_capacity: workers * 2,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Start the workers inside `scope`.
    ///
    /// Each worker owns a clone of `result_tx`; the original is dropped before
    /// returning, so the output queue disconnects exactly when the last
    /// worker exits. Each handle yields the number of candidates that worker
    /// evaluated.
    ///
    /// Fails only if not a single worker could be started. A partial start
    /// is logged and the sweep continues on the workers that did start.
    pub fn spawn<'scope, 'env, S>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        evaluator: &'env Evaluator<S>,
        work_rx: Receiver<WorkItem>,
        result_tx: Sender<ScoredResult>,
    ) -> Result<Vec<ScopedJoinHandle<'scope, usize>>, SweepError>
    where
        S: OutcomeSource + 'env,
    {
        let mut handles = Vec::with_capacity(self.workers);

        for id in 0..self.workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("wt-worker-{id}"))
                .spawn_scoped(scope, move || worker_loop(id, evaluator, work_rx, result_tx));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("Failed to spawn worker {}: {}", id, e),
            }
        }

        if handles.is_empty() {
            return Err(SweepError::NoWorkers);
        }
        if handles.len() < self.workers {
            warn!(
                "Running with {} of {} requested workers",
                handles.len(),
                self.workers
            );
        }

        Ok(handles)
    }
}

/// Idle on `recv`, evaluate, push, repeat; done once the work queue is
/// closed and empty.
fn worker_loop<S: OutcomeSource>(
    id: usize,
    evaluator: &Evaluator<S>,
    work_rx: Receiver<WorkItem>,
    result_tx: Sender<ScoredResult>,
) -> usize {
    let mut evaluated = 0;

    for (ordinal, candidate) in work_rx.iter() {
        let result = evaluator.evaluate(ordinal, candidate);
        evaluated += 1;
        if result_tx.send(result).is_err() {
            warn!("Worker {} stopping: result queue closed", id);
            break;
        }
    }

    debug!("Worker {} done after {} candidates", id, evaluated);
    evaluated
}

/// Feed every candidate into the work queue, then close it by dropping the
/// sender. Returns the number of candidates enqueued.
pub fn produce<I>(candidates: I, work_tx: Sender<WorkItem>) -> usize
where
    I: IntoIterator<Item = Candidate>,
{
    let mut sent = 0;
    for item in candidates.into_iter().enumerate() {
        if work_tx.send(item).is_err() {
            warn!("Producer stopping after {} candidates: no workers left", sent);
            break;
        }
        sent += 1;
    }
    sent
}
