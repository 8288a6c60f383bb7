use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

/// One point in the parameter grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate {
    values: Vec<f64>,
}

impl Candidate {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Sum of all coordinates.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl From<Vec<f64>> for Candidate {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}

/// Describes the discrete value set along one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AxisKind {
    /// `center + k * step` for every `k` in `-radius..=radius`.
    Stepped { center: f64, step: f64, radius: usize },
    /// An explicit list of values, swept in the given order.
    Values { values: Vec<f64> },
}

/// A single tunable dimension: the configuration name injected into the
/// collaborator's environment plus the axis it is swept over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSpec {
    /// Environment variable name (e.g. "WEIGHT_MATCHED").
    pub name: String,
    #[serde(flatten)]
    pub kind: AxisKind,
}

impl DimensionSpec {
    pub fn stepped(name: impl Into<String>, center: f64, step: f64, radius: usize) -> Self {
        Self {
            name: name.into(),
            kind: AxisKind::Stepped {
                center,
                step,
                radius,
            },
        }
    }

    pub fn values(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: AxisKind::Values { values },
        }
    }

    /// Number of distinct values on this axis, `None` if a stepped axis is
    /// too wide to count in a `usize`.
    pub fn len(&self) -> Option<usize> {
        match &self.kind {
            AxisKind::Stepped { radius, .. } => radius.checked_mul(2)?.checked_add(1),
            AxisKind::Values { values } => Some(values.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Value at position `index` along the axis, lowest `k` first.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        if index >= self.len()? {
            return None;
        }
        match &self.kind {
            AxisKind::Stepped {
                center,
                step,
                radius,
            } => {
                let k = index as i128 - *radius as i128;
                Some(center + k as f64 * step)
            }
            AxisKind::Values { values } => values.get(index).copied(),
        }
    }

    /// All values on this axis in sweep order.
    pub fn axis_values(&self) -> Vec<f64> {
        (0..self.len().unwrap_or(0))
            .filter_map(|i| self.value_at(i))
            .collect()
    }

    /// Smallest and largest value on the axis, `None` when empty.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.axis_values().into_iter().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// A candidate paired with its mean outcome across repeated runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Position of the candidate in grid generation order.
    pub ordinal: usize,
    pub candidate: Candidate,
    pub mean: f64,
    /// Runs whose outcome was replaced by the failure sentinel.
    pub failed_runs: usize,
}

impl ScoredResult {
    /// Ranking order: higher mean first, then earlier generation order.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .mean
            .total_cmp(&self.mean)
            .then_with(|| self.ordinal.cmp(&other.ordinal))
    }
}

/// Count of results consumed so far.
///
/// Only the collector increments it; any thread holding a clone may read it.
/// A read is a lower bound on true progress.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    inner: Arc<AtomicUsize>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new value.
    pub fn increment(&self) -> usize {
        self.inner.fetch_add(1, AtomicOrdering::AcqRel) + 1
    }

    pub fn get(&self) -> usize {
        self.inner.load(AtomicOrdering::Acquire)
    }
}
