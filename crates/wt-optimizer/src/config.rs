//! Sweep configuration.
//!
//! Defaults reproduce the reference tuning run: five hint weights around
//! their hand-picked centers, step 0.25, two steps each way, ten games per
//! candidate.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wt_types::{config_error, AxisKind, DimensionSpec, WtError, WtResult};

use crate::evaluator::{Evaluator, ProcessOutcome, DEFAULT_FAILURE_OUTCOME};
use crate::grid::Grid;
use crate::sweep::{default_workers, Sweep};

pub const CONFIG_PATH_VAR: &str = "WT_SWEEP_CONFIG";
pub const REPEATS_VAR: &str = "WT_SWEEP_REPEATS";
pub const WORKERS_VAR: &str = "WT_SWEEP_WORKERS";
pub const TIMEOUT_VAR: &str = "WT_SWEEP_TIMEOUT_SECS";
pub const OUTPUT_VAR: &str = "WT_SWEEP_OUTPUT";

/// How the final report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = WtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(config_error!("unknown output format: {}", other)),
        }
    }
}

/// Top-level configuration for a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Swept dimensions, in injection and reporting order.
    pub dimensions: Vec<DimensionSpec>,

    /// Collaborator runs per candidate.
    pub repeats: usize,

    /// Worker threads; `None` uses the available parallelism.
    pub workers: Option<usize>,

    /// Collaborator executable and its fixed arguments.
    pub program: String,
    pub args: Vec<String>,

    /// Decimal places for injected and printed values.
    pub precision: usize,

    /// Outcome recorded for runs that cannot complete normally.
    pub failure_outcome: i64,

    /// Per-run wall-clock limit; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,

    /// Progress is logged every this many results.
    pub report_every: usize,

    /// Results shown in the ranked listing.
    pub top_k: usize,

    pub output: OutputFormat,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let centers = [
            ("WEIGHT_MATCHED", 0.5),
            ("WEIGHT_COMPLETE", 1.5),
            ("WEIGHT_PLAYABLE", 1.5),
            ("WEIGHT_DISCARDABLE", 1.0),
            ("WEIGHT_FINAL_CARD", 1.0),
        ];
        Self {
            dimensions: centers
                .iter()
                .map(|(name, center)| DimensionSpec::stepped(*name, *center, 0.25, 2))
                .collect(),
            repeats: 10,
            workers: None,
            program: "java".to_string(),
            args: [
                "-cp",
                "target/classes/",
                "com.javanabi.HanabiServer",
                "BestValueHint",
                "BestValueHint",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            precision: 1,
            failure_outcome: DEFAULT_FAILURE_OUTCOME,
            timeout_secs: None,
            report_every: 1000,
            top_k: 10,
            output: OutputFormat::Text,
        }
    }
}

impl SweepConfig {
    pub fn from_json_str(json: &str) -> WtResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> WtResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load from the file named by `WT_SWEEP_CONFIG` if set, otherwise start
    /// from the defaults, then apply environment overrides.
    pub fn from_env() -> WtResult<Self> {
        let config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_json_file(path)?,
            Err(_) => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply the `WT_SWEEP_*` overrides produced by `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> WtResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(REPEATS_VAR) {
            self.repeats = parse_var(REPEATS_VAR, &v)?;
        }
        if let Some(v) = lookup(WORKERS_VAR) {
            self.workers = Some(parse_var(WORKERS_VAR, &v)?);
        }
        if let Some(v) = lookup(TIMEOUT_VAR) {
            self.timeout_secs = Some(parse_var(TIMEOUT_VAR, &v)?);
        }
        if let Some(v) = lookup(OUTPUT_VAR) {
            self.output = v.parse()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> WtResult<()> {
        let mut seen = HashSet::new();
        for dim in &self.dimensions {
            if dim.name.trim().is_empty() {
                return Err(config_error!("dimension name must not be empty"));
            }
            if !seen.insert(dim.name.as_str()) {
                return Err(config_error!("duplicate dimension name: {}", dim.name));
            }
            match &dim.kind {
                AxisKind::Stepped { center, step, .. } => {
                    if !center.is_finite() {
                        return Err(config_error!("{}: center must be finite", dim.name));
                    }
                    if !step.is_finite() || *step <= 0.0 {
                        return Err(config_error!("{}: step must be positive", dim.name));
                    }
                    if dim.len().is_none() {
                        return Err(config_error!("{}: radius is too large", dim.name));
                    }
                }
                AxisKind::Values { values } => {
                    if values.iter().any(|v| !v.is_finite()) {
                        return Err(config_error!("{}: values must be finite", dim.name));
                    }
                }
            }
        }
        if let Err(e) = self.grid().size() {
            return Err(config_error!("{}", e));
        }
        if self.repeats == 0 {
            return Err(config_error!("repeats must be at least 1"));
        }
        if self.workers == Some(0) {
            return Err(config_error!("workers must be at least 1"));
        }
        if self.report_every == 0 {
            return Err(config_error!("report_every must be at least 1"));
        }
        if self.top_k == 0 {
            return Err(config_error!("top_k must be at least 1"));
        }
        if self.program.trim().is_empty() {
            return Err(config_error!("program must not be empty"));
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.name.clone()).collect()
    }

    pub fn grid(&self) -> Grid {
        Grid {
            dimensions: self.dimensions.clone(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }

    /// Validate and assemble a sweep driven by the external collaborator.
    pub fn build(&self) -> WtResult<Sweep<ProcessOutcome>> {
        self.validate()?;

        let source = ProcessOutcome::new(self.program.clone(), self.args.clone(), self.names())
            .with_precision(self.precision)
            .with_timeout(self.timeout());
        let evaluator =
            Evaluator::new(source, self.repeats).with_failure_outcome(self.failure_outcome);

        Ok(Sweep::new(self.grid(), evaluator)
            .with_workers(self.worker_count())
            .with_report_every(self.report_every)
            .with_top_k(self.top_k)
            .with_precision(self.precision))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> WtResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| config_error!("{}: invalid value {:?}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_matches_reference_run() {
        let config = SweepConfig::default();
        config.validate().unwrap();
        assert_eq!(config.dimensions.len(), 5);
        assert_eq!(config.grid().size().unwrap(), 3125);
        assert_eq!(config.names()[0], "WEIGHT_MATCHED");
        assert_eq!(config.repeats, 10);
        assert_eq!(config.program, "java");
        assert_eq!(config.args.len(), 5);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SweepConfig::from_json_str(
            r#"{
                "dimensions": [
                    {"name": "A", "kind": "stepped", "center": 0.0, "step": 1.0, "radius": 1},
                    {"name": "B", "kind": "values", "values": [0.1, 0.2]}
                ],
                "repeats": 3,
                "output": "json"
            }"#,
        )
        .unwrap();
        assert_eq!(config.repeats, 3);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.grid().size().unwrap(), 6);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.program, "java");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"repeats": 4, "workers": 2, "timeout_secs": 10}}"#).unwrap();

        let config = SweepConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.repeats, 4);
        assert_eq!(config.worker_count(), 2);
        assert_eq!(config.timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn malformed_file_is_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = SweepConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, WtError::Serialization(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            (REPEATS_VAR, "25"),
            (WORKERS_VAR, " 3 "),
            (TIMEOUT_VAR, "7"),
            (OUTPUT_VAR, "JSON"),
        ]
        .into_iter()
        .collect();
        let config = SweepConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.repeats, 25);
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.timeout_secs, Some(7));
        assert_eq!(config.output, OutputFormat::Json);
    }

    #[test]
    fn bad_override_is_config_error() {
        let err = SweepConfig::default()
            .with_overrides(|k| (k == REPEATS_VAR).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, WtError::Config(ref m) if m.contains(REPEATS_VAR)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases: Vec<Box<dyn Fn(&mut SweepConfig)>> = vec![
            Box::new(|c: &mut SweepConfig| c.repeats = 0),
            Box::new(|c: &mut SweepConfig| c.workers = Some(0)),
            Box::new(|c: &mut SweepConfig| c.report_every = 0),
            Box::new(|c: &mut SweepConfig| c.top_k = 0),
            Box::new(|c: &mut SweepConfig| c.program = "  ".into()),
            Box::new(|c: &mut SweepConfig| c.dimensions[0].name = String::new()),
            Box::new(|c: &mut SweepConfig| {
                c.dimensions[1].name = "WEIGHT_MATCHED".into()
            }),
            Box::new(|c: &mut SweepConfig| {
                c.dimensions[0] = DimensionSpec::stepped("X", 0.0, 0.0, 1)
            }),
            Box::new(|c: &mut SweepConfig| {
                c.dimensions[0] = DimensionSpec::stepped("X", f64::NAN, 1.0, 1)
            }),
            Box::new(|c: &mut SweepConfig| {
                c.dimensions[0] = DimensionSpec::values("X", vec![f64::INFINITY])
            }),
        ];
        for (i, mutate) in cases.iter().enumerate() {
            let mut config = SweepConfig::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(WtError::Config(_))),
                "case {i} should fail validation"
            );
        }
    }

    #[test]
    fn oversized_grid_is_config_error() {
        let mut config = SweepConfig::default();
        config.dimensions[0] = DimensionSpec::stepped("X", 0.0, 1.0, usize::MAX / 2 + 1);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, WtError::Config(ref m) if m.contains("radius")));

        // Each axis fits, the product does not.
        let config = SweepConfig {
            dimensions: (0..64)
                .map(|i| DimensionSpec::stepped(format!("W{i}"), 0.0, 1.0, 10))
                .collect(),
            ..SweepConfig::default()
        };
        assert!(matches!(config.validate(), Err(WtError::Config(_))));
        assert!(matches!(config.build(), Err(WtError::Config(_))));
    }

    #[test]
    fn build_uses_configured_sizes() {
        let config = SweepConfig {
            workers: Some(3),
            repeats: 4,
            ..SweepConfig::default()
        };
        let plan = config.build().unwrap().plan().unwrap();
        assert_eq!(plan.workers, 3);
        assert_eq!(plan.candidates, 3125);
        assert_eq!(plan.invocations(), 12_500);
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = SweepConfig {
            repeats: 0,
            ..SweepConfig::default()
        };
        assert!(config.build().is_err());
    }
}
