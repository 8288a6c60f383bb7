//! Sweep orchestration: producer, worker pool, and collector wiring.
//!
//! A sweep runs three kinds of threads inside one [`std::thread::scope`]:
//!
//! - one producer enumerating the grid into the bounded work queue, then
//!   closing it;
//! - `W` workers evaluating candidates into the bounded output queue;
//! - one collector draining the output queue into an [`Aggregator`].
//!
//! Completion is a blocking join on every worker and then on the collector.
//! The output queue has no explicit close: it disconnects when the last
//! worker drops its sender, so no result can be lost to an early close.

use std::thread;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Sender};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;
use wt_types::{SweepError, WtResult};

use crate::aggregator::{Aggregator, ProgressEvent};
use crate::evaluator::{Evaluator, OutcomeSource};
use crate::grid::Grid;
use crate::pool::{produce, WorkerPool};
use crate::report::{SweepPlan, SweepReport};

/// Unique sweep identifier.
pub type SweepId = Uuid;

/// Worker count used when none is configured.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Lifecycle state for a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate status of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepStatus {
    pub id: SweepId,
    pub state: SweepState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SweepStatus {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SweepState::Pending,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = SweepState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = SweepState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = SweepState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }
}

impl Default for SweepStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a finished sweep produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub status: SweepStatus,
    pub plan: SweepPlan,
    pub report: SweepReport,
}

/// An exhaustive sweep of `grid`, scored by `evaluator`.
pub struct Sweep<S> {
    grid: Grid,
    evaluator: Evaluator<S>,
    pool: WorkerPool,
    report_every: usize,
    top_k: usize,
    precision: usize,
    progress_tx: Option<Sender<ProgressEvent>>,
}

impl<S: OutcomeSource> Sweep<S> {
    pub fn new(grid: Grid, evaluator: Evaluator<S>) -> Self {
        Self {
            grid,
            evaluator,
            pool: WorkerPool::new(default_workers()),
            report_every: 1000,
            top_k: 10,
            precision: 1,
            progress_tx: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.pool = WorkerPool::new(workers);
        self
    }

    pub fn with_report_every(mut self, n: usize) -> Self {
        self.report_every = n;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_progress_channel(mut self, tx: Sender<ProgressEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn plan(&self) -> WtResult<SweepPlan> {
        Ok(SweepPlan {
            workers: self.pool.workers(),
            candidates: self.grid.size()?,
            repeats: self.evaluator.repeats(),
        })
    }

    /// Evaluate every candidate and rank the results.
    pub fn run(self) -> WtResult<SweepOutcome> {
        let mut status = SweepStatus::new();
        self.run_with_status(&mut status)
    }

    /// Like [`Sweep::run`], recording the lifecycle into `status` so a failed
    /// sweep can still be inspected by the caller.
    pub fn run_with_status(self, status: &mut SweepStatus) -> WtResult<SweepOutcome> {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                status.mark_failed(e.to_string());
                error!("Sweep {} failed: {}", status.id, e);
                return Err(e);
            }
        };

        status.mark_running();
        info!(
            "Starting sweep {}: {} candidates x {} runs on {} workers",
            status.id, plan.candidates, plan.repeats, plan.workers
        );

        match self.execute(plan.candidates) {
            Ok(report) => {
                status.mark_completed();
                info!("Sweep {} completed with {} results", status.id, report.len());
                Ok(SweepOutcome {
                    status: status.clone(),
                    plan,
                    report,
                })
            }
            Err(e) => {
                status.mark_failed(e.to_string());
                error!("Sweep {} failed: {}", status.id, e);
                Err(e)
            }
        }
    }

    fn execute(self, total: usize) -> WtResult<SweepReport> {
        let Sweep {
            grid,
            evaluator,
            pool,
            report_every,
            top_k,
            precision,
            progress_tx,
        } = self;

        let names = grid.names().into_iter().map(String::from).collect();
        let candidates = grid.iter()?;

        let mut aggregator = Aggregator::new(total, report_every);
        if let Some(tx) = progress_tx {
            aggregator = aggregator.with_progress_channel(tx);
        }

        let (work_tx, work_rx) = bounded(pool.queue_capacity());
        let (result_tx, result_rx) = bounded(pool.queue_capacity());

        let aggregator = thread::scope(|s| -> Result<Aggregator, SweepError> {
            let collector = thread::Builder::new()
                .name("wt-collector".into())
                .spawn_scoped(s, move || {
                    aggregator.drain(&result_rx);
                    aggregator
                })
                .map_err(|source| SweepError::Spawn {
                    role: "collector",
                    source,
                })?;

            let workers = pool.spawn(s, &evaluator, work_rx, result_tx)?;

            let producer = thread::Builder::new()
                .name("wt-producer".into())
                .spawn_scoped(s, move || produce(candidates, work_tx))
                .map_err(|source| SweepError::Spawn {
                    role: "producer",
                    source,
                })?;

            let mut failure = None;
            if producer.join().is_err() {
                failure = Some(SweepError::Panicked { role: "producer" });
            }
            for worker in workers {
                if worker.join().is_err() && failure.is_none() {
                    failure = Some(SweepError::Panicked { role: "worker" });
                }
            }
            let aggregator = collector
                .join()
                .map_err(|_| SweepError::Panicked { role: "collector" })?;

            match failure {
                Some(e) => Err(e),
                None => Ok(aggregator),
            }
        })?;

        if aggregator.consumed() != total {
            return Err(SweepError::IncompleteResults {
                expected: total,
                received: aggregator.consumed(),
            }
            .into());
        }

        Ok(SweepReport::new(
            names,
            precision,
            top_k,
            aggregator.into_ranked(),
        ))
    }
}
