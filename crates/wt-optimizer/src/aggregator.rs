//! Result collection, progress reporting, and final ranking.
//!
//! The [`Aggregator`] is the single owner of the result set. It runs on the
//! collector thread, drains the output queue, and emits [`ProgressEvent`]s on
//! an optional channel every `report_every` results.

use std::cmp::Ordering;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wt_types::{ProgressCounter, ScoredResult};

/// Periodic progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub completed: usize,
    pub total: usize,
    /// Best result seen so far.
    pub best: Option<ScoredResult>,
}

/// Collects scored results until the expected count has been consumed.
#[derive(Debug)]
pub struct Aggregator {
    total: usize,
    report_every: usize,
    progress: ProgressCounter,
    progress_tx: Option<Sender<ProgressEvent>>,
    results: Vec<ScoredResult>,
    best: Option<ScoredResult>,
}

impl Aggregator {
    /// `report_every` is clamped to at least one.
    pub fn new(total: usize, report_every: usize) -> Self {
        Self {
            total,
            report_every: report_every.max(1),
            progress: ProgressCounter::new(),
            progress_tx: None,
            results: Vec::with_capacity(total),
            best: None,
        }
    }

    pub fn with_progress_channel(mut self, tx: Sender<ProgressEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Handle for observing progress from other threads.
    pub fn counter(&self) -> ProgressCounter {
        self.progress.clone()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn consumed(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        self.consumed() >= self.total
    }

    pub fn best(&self) -> Option<&ScoredResult> {
        self.best.as_ref()
    }

    /// Append one result and report progress on cadence.
    pub fn record(&mut self, result: ScoredResult) {
        self.update_best(&result);
        self.results.push(result);
        let completed = self.progress.increment();

        if completed % self.report_every == 0 {
            self.emit(completed);
        }
    }

    /// Consume from `rx` until every expected result has arrived or all
    /// senders are gone.
    pub fn drain(&mut self, rx: &Receiver<ScoredResult>) {
        while !self.is_complete() {
            match rx.recv() {
                Ok(result) => self.record(result),
                Err(_) => {
                    debug!(
                        consumed = self.consumed(),
                        total = self.total,
                        "output queue disconnected"
                    );
                    break;
                }
            }
        }
    }

    /// Sort the result set into its final ranking.
    pub fn into_ranked(self) -> Vec<ScoredResult> {
        let mut results = self.results;
        rank(&mut results);
        results
    }

    fn update_best(&mut self, result: &ScoredResult) {
        let improves = match &self.best {
            None => true,
            Some(current) => result.rank_cmp(current) == Ordering::Less,
        };
        if improves {
            self.best = Some(result.clone());
        }
    }

    fn emit(&self, completed: usize) {
        match &self.best {
            Some(best) => info!(
                "Progress: {}/{} | best so far: {} = {:.2}",
                completed, self.total, best.candidate, best.mean
            ),
            None => info!("Progress: {}/{}", completed, self.total),
        }

        if let Some(tx) = &self.progress_tx {
            // Best-effort; a full or dropped receiver must not stall collection.
            let _ = tx.try_send(ProgressEvent {
                completed,
                total: self.total,
                best: self.best.clone(),
            });
        }
    }
}

/// Descending mean, ties in generation order.
pub fn rank(results: &mut [ScoredResult]) {
    results.sort_by(ScoredResult::rank_cmp);
}
