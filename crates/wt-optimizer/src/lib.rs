//! # wt-optimizer
//!
//! Exhaustive parallel grid sweep for tuning the weights of an external
//! decision-making program.
//!
//! Provides the grid generator, the repeated-run evaluator, a bounded worker
//! pool, the result aggregator, final ranking and rendering, and the sweep
//! orchestrator that wires them together.

mod aggregator;
mod config;
mod evaluator;
mod grid;
mod pool;
mod report;
mod sweep;

pub use aggregator::{rank, Aggregator, ProgressEvent};
pub use config::{
    OutputFormat, SweepConfig, CONFIG_PATH_VAR, OUTPUT_VAR, REPEATS_VAR, TIMEOUT_VAR,
    WORKERS_VAR,
};
pub use evaluator::{Evaluator, OutcomeSource, ProcessOutcome, DEFAULT_FAILURE_OUTCOME};
pub use grid::{Grid, GridIter};
pub use pool::{produce, WorkItem, WorkerPool};
pub use report::{SweepPlan, SweepReport};
pub use sweep::{default_workers, Sweep, SweepId, SweepOutcome, SweepState, SweepStatus};
