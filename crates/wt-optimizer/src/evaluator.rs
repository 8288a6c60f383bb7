//! Candidate evaluation: repeated collaborator runs reduced to a mean.
//!
//! The [`Evaluator`] is agnostic of where an outcome comes from. The default
//! [`ProcessOutcome`] source launches an external program with the candidate
//! injected into its environment and scores the run by its exit code. Any
//! other channel (parsed stdout, an in-process model) only has to implement
//! [`OutcomeSource`].

use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wt_types::{Candidate, RunError, ScoredResult};

/// Outcome recorded for a run that could not complete normally.
pub const DEFAULT_FAILURE_OUTCOME: i64 = 0;

const TIMEOUT_POLL_INTERVAL: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// Outcome sources
// ---------------------------------------------------------------------------

/// Produces one integer outcome per run for a candidate.
pub trait OutcomeSource: Send + Sync {
    fn run(&self, candidate: &Candidate) -> Result<i64, RunError>;
}

impl<F> OutcomeSource for F
where
    F: Fn(&Candidate) -> Result<i64, RunError> + Send + Sync,
{
    fn run(&self, candidate: &Candidate) -> Result<i64, RunError> {
        self(candidate)
    }
}

// ---- External process ----

/// Runs an external program once per call and reports its exit code.
///
/// The child inherits the current environment plus one `NAME=value` entry
/// per dimension, value rendered with a fixed number of decimals. Its
/// standard streams are discarded.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    program: String,
    args: Vec<String>,
    names: Vec<String>,
    precision: usize,
    timeout: Option<Duration>,
}

impl ProcessOutcome {
    pub fn new(program: impl Into<String>, args: Vec<String>, names: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            names,
            precision: 1,
            timeout: None,
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Environment entries injected for `candidate`, in dimension order.
    pub fn overrides(&self, candidate: &Candidate) -> Vec<(String, String)> {
        self.names
            .iter()
            .zip(candidate.values())
            .map(|(name, value)| (name.clone(), format!("{:.*}", self.precision, value)))
            .collect()
    }

    fn command(&self, candidate: &Candidate) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.overrides(candidate))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, RunError> {
        let wait_err = |source| RunError::Wait {
            program: self.program.clone(),
            source,
        };

        let Some(timeout) = self.timeout else {
            return child.wait().map_err(wait_err);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(wait_err)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // Reap the killed child so it does not linger as a zombie.
                let _ = child.kill();
                let _ = child.wait();
                return Err(RunError::Timeout {
                    program: self.program.clone(),
                    timeout_ms: timeout.as_millis(),
                });
            }
            thread::sleep(TIMEOUT_POLL_INTERVAL);
        }
    }
}

impl OutcomeSource for ProcessOutcome {
    fn run(&self, candidate: &Candidate) -> Result<i64, RunError> {
        let mut child = self
            .command(candidate)
            .spawn()
            .map_err(|source| RunError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let status = self.wait(&mut child)?;
        status
            .code()
            .map(i64::from)
            .ok_or_else(|| RunError::Terminated {
                program: self.program.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Scores a candidate by running its outcome source a fixed number of times.
#[derive(Debug, Clone)]
pub struct Evaluator<S> {
    source: S,
    repeats: usize,
    failure_outcome: i64,
}

impl<S: OutcomeSource> Evaluator<S> {
    /// `repeats` is clamped to at least one run.
    pub fn new(source: S, repeats: usize) -> Self {
        Self {
            source,
            repeats: repeats.max(1),
            failure_outcome: DEFAULT_FAILURE_OUTCOME,
        }
    }

    pub fn with_failure_outcome(mut self, outcome: i64) -> Self {
        self.failure_outcome = outcome;
        self
    }

    pub fn repeats(&self) -> usize {
        self.repeats
    }

    pub fn failure_outcome(&self) -> i64 {
        self.failure_outcome
    }

    /// Run the candidate `repeats` times and average the outcomes.
    ///
    /// Failed runs are never retried; each contributes the failure outcome.
    pub fn evaluate(&self, ordinal: usize, candidate: Candidate) -> ScoredResult {
        let mut total: i64 = 0;
        let mut failed_runs = 0;

        for run in 0..self.repeats {
            match self.source.run(&candidate) {
                Ok(outcome) => total += outcome,
                Err(e) => {
                    debug!(ordinal, run, error = %e, "run failed");
                    failed_runs += 1;
                    total += self.failure_outcome;
                }
            }
        }

        if failed_runs > 0 {
            warn!(
                ordinal,
                %candidate,
                failed_runs,
                repeats = self.repeats,
                "recorded failure outcome for failed runs"
            );
        }

        // Integer sum, one division: identical outcomes average exactly.
        ScoredResult {
            ordinal,
            candidate,
            mean: total as f64 / self.repeats as f64,
            failed_runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn constant(outcome: i64) -> impl Fn(&Candidate) -> Result<i64, RunError> + Send + Sync {
        move |_: &Candidate| Ok(outcome)
    }

    #[test]
    fn identical_outcomes_average_exactly() {
        for outcome in [0, 1, 7, 25, 255, -3] {
            for repeats in [1, 2, 3, 10, 999, 10_000] {
                let evaluator = Evaluator::new(constant(outcome), repeats);
                let result = evaluator.evaluate(0, Candidate::new(vec![0.0]));
                assert_eq!(result.mean, outcome as f64);
                assert_eq!(result.failed_runs, 0);
            }
        }
    }

    #[test]
    fn runs_exactly_repeats_times() {
        let calls = AtomicUsize::new(0);
        let source = |_: &Candidate| -> Result<i64, RunError> {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(n as i64)
        };
        let result = Evaluator::new(source, 4).evaluate(3, Candidate::new(vec![1.0]));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.mean, 1.5); // (0 + 1 + 2 + 3) / 4
        assert_eq!(result.ordinal, 3);
    }

    #[test]
    fn failed_runs_use_failure_outcome() {
        let calls = AtomicUsize::new(0);
        let source = |_: &Candidate| -> Result<i64, RunError> {
            if calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(RunError::Terminated {
                    program: "stub".into(),
                })
            } else {
                Ok(10)
            }
        };
        let result = Evaluator::new(source, 4)
            .with_failure_outcome(-2)
            .evaluate(0, Candidate::new(vec![0.0]));
        assert_eq!(result.failed_runs, 2);
        assert_eq!(result.mean, 4.0); // (-2 + 10 - 2 + 10) / 4
    }

    #[test]
    fn zero_repeats_clamped() {
        let evaluator = Evaluator::new(constant(9), 0);
        assert_eq!(evaluator.repeats(), 1);
        assert_eq!(evaluator.evaluate(0, Candidate::new(vec![])).mean, 9.0);
    }

    #[test]
    fn overrides_use_fixed_precision() {
        let source = ProcessOutcome::new("true", vec![], vec!["A".into(), "B".into()]);
        let overrides = source.overrides(&Candidate::new(vec![0.75, 1.0]));
        assert_eq!(
            overrides,
            vec![
                ("A".to_string(), "0.8".to_string()),
                ("B".to_string(), "1.0".to_string())
            ]
        );

        let source = source.with_precision(2);
        let overrides = source.overrides(&Candidate::new(vec![0.75, 1.0]));
        assert_eq!(overrides[0].1, "0.75");
    }

    #[test]
    fn missing_program_is_launch_error() {
        let source = ProcessOutcome::new("/nonexistent/wt-collaborator", vec![], vec![]);
        let err = source.run(&Candidate::new(vec![])).unwrap_err();
        assert!(matches!(err, RunError::Launch { .. }));

        let result = Evaluator::new(source, 3).evaluate(0, Candidate::new(vec![]));
        assert_eq!(result.failed_runs, 3);
        assert_eq!(result.mean, DEFAULT_FAILURE_OUTCOME as f64);
    }

    #[cfg(unix)]
    fn sh(script: &str, names: &[&str]) -> ProcessOutcome {
        ProcessOutcome::new(
            "/bin/sh",
            vec!["-c".into(), script.into()],
            names.iter().map(|n| n.to_string()).collect(),
        )
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_is_outcome() {
        let source = sh("exit 42", &[]);
        assert_eq!(source.run(&Candidate::new(vec![])).unwrap(), 42);
    }

    #[cfg(unix)]
    #[test]
    fn environment_is_injected() {
        // "3.0" -> 3, "4.0" -> 4
        let source = sh(r#"a=${WT_A%.*}; b=${WT_B%.*}; exit $((a + b))"#, &["WT_A", "WT_B"]);
        assert_eq!(source.run(&Candidate::new(vec![3.0, 4.0])).unwrap(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn signal_termination_is_reported() {
        let source = sh("kill -9 $$", &[]);
        let err = source.run(&Candidate::new(vec![])).unwrap_err();
        assert!(matches!(err, RunError::Terminated { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn slow_run_times_out() {
        let source = sh("sleep 5", &[]).with_timeout(Some(Duration::from_millis(50)));
        let started = Instant::now();
        let err = source.run(&Candidate::new(vec![])).unwrap_err();
        assert!(matches!(err, RunError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
