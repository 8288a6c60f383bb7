//! Grid definition and Cartesian-product enumeration.

use serde::{Deserialize, Serialize};
use wt_types::{Candidate, DimensionSpec, GridError};

/// The full sweep space: an ordered list of dimension specs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grid {
    pub dimensions: Vec<DimensionSpec>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dimension shares the same step and radius around its own center.
    pub fn uniform<S: AsRef<str>>(
        names: &[S],
        center: &[f64],
        step: f64,
        radius: usize,
    ) -> Result<Self, GridError> {
        if names.len() != center.len() {
            return Err(GridError::DimensionMismatch {
                expected: names.len(),
                actual: center.len(),
            });
        }
        Ok(names
            .iter()
            .zip(center)
            .fold(Self::new(), |grid, (name, c)| {
                grid.add_stepped(name.as_ref(), *c, step, radius)
            }))
    }

    pub fn add_stepped(
        mut self,
        name: impl Into<String>,
        center: f64,
        step: f64,
        radius: usize,
    ) -> Self {
        self.dimensions
            .push(DimensionSpec::stepped(name, center, step, radius));
        self
    }

    pub fn add_values(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.dimensions.push(DimensionSpec::values(name, values));
        self
    }

    /// Configuration names in dimension order.
    pub fn names(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.name.as_str()).collect()
    }

    /// Total number of candidates. A grid without dimensions is empty.
    pub fn size(&self) -> Result<usize, GridError> {
        if self.dimensions.is_empty() {
            return Ok(0);
        }
        self.axis_lens()?
            .into_iter()
            .try_fold(1usize, |total, len| total.checked_mul(len))
            .ok_or(GridError::TooLarge)
    }

    fn axis_lens(&self) -> Result<Vec<usize>, GridError> {
        self.dimensions
            .iter()
            .map(|d| d.len().ok_or(GridError::TooLarge))
            .collect()
    }

    /// Lazily enumerate every candidate, first dimension slowest.
    pub fn iter(&self) -> Result<GridIter, GridError> {
        let remaining = self.size()?;
        Ok(GridIter {
            dimensions: self.dimensions.clone(),
            lens: self.axis_lens()?,
            cursor: vec![0; self.dimensions.len()],
            remaining,
        })
    }

    /// Materialize the whole grid. Prefer [`Grid::iter`] for large sweeps.
    pub fn candidates(&self) -> Result<Vec<Candidate>, GridError> {
        Ok(self.iter()?.collect())
    }
}

/// Odometer over the axis values of a [`Grid`].
#[derive(Debug, Clone)]
pub struct GridIter {
    dimensions: Vec<DimensionSpec>,
    lens: Vec<usize>,
    cursor: Vec<usize>,
    remaining: usize,
}

impl Iterator for GridIter {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        if self.remaining == 0 {
            return None;
        }
        let values = self
            .cursor
            .iter()
            .zip(&self.dimensions)
            .map(|(&i, dim)| dim.value_at(i))
            .collect::<Option<Vec<f64>>>()?;
        self.remaining -= 1;

        // Advance, last dimension fastest.
        for d in (0..self.cursor.len()).rev() {
            self.cursor[d] += 1;
            if self.cursor[d] < self.lens[d] {
                break;
            }
            self.cursor[d] = 0;
        }

        Some(Candidate::new(values))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for GridIter {}
