//! Bounded search points
//!
//! Continuous optimizers move freely through real space. A
//! [`BoundedSearchPoint`] keeps the raw position together with per-dimension
//! bounds and projects it back into them by reflection whenever a genome has
//! to be derived.

use serde::{Deserialize, Serialize};

use crate::error::SearchPointError;

/// Upper end of every standardized dimension
pub const STANDARDIZED_UPPER: f64 = 10.0;

/// Bounds for a single dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl Bounds {
    /// Create new bounds
    pub fn new(min: f64, max: f64) -> Result<Self, SearchPointError> {
        if !(min <= max) || !min.is_finite() || !max.is_finite() {
            return Err(SearchPointError::InvalidBounds {
                dimension: 0,
                lower: min,
                upper: max,
            });
        }
        Ok(Self { min, max })
    }

    /// The standardized interval `[0, 10]`
    pub fn standardized() -> Self {
        Self {
            min: 0.0,
            max: STANDARDIZED_UPPER,
        }
    }

    /// Get the range (max - min)
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Check if a value is within bounds
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Reflect a value back into the bounds.
    ///
    /// The bounds act as mirrors, repeatedly if needed, so the result is
    /// periodic in the input with period `2 * range`. Infinite inputs go to
    /// the nearer bound, NaN goes to the lower bound.
    pub fn reflect(&self, value: f64) -> f64 {
        if self.contains(value) {
            return value;
        }
        let range = self.range();
        if range == 0.0 || value.is_nan() {
            return self.min;
        }
        if value.is_infinite() {
            return if value > 0.0 { self.max } else { self.min };
        }
        let offset = (value - self.min).rem_euclid(2.0 * range);
        let folded = if offset > range { 2.0 * range - offset } else { offset };
        (self.min + folded).clamp(self.min, self.max)
    }
}

/// Multi-dimensional bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiBounds {
    /// Bounds for each dimension
    pub bounds: Vec<Bounds>,
}

impl MultiBounds {
    /// Create new multi-dimensional bounds
    pub fn new(bounds: Vec<Bounds>) -> Self {
        Self { bounds }
    }

    /// Create uniform bounds for all dimensions
    pub fn uniform(bound: Bounds, dimension: usize) -> Self {
        Self {
            bounds: vec![bound; dimension],
        }
    }

    /// Create bounds from separate lower and upper vectors
    pub fn from_limits(lower: &[f64], upper: &[f64]) -> Result<Self, SearchPointError> {
        if lower.len() != upper.len() {
            return Err(SearchPointError::DimensionMismatch {
                expected: lower.len(),
                actual: upper.len(),
            });
        }
        lower
            .iter()
            .zip(upper)
            .enumerate()
            .map(|(dimension, (&lower, &upper))| {
                Bounds::new(lower, upper).map_err(|_| SearchPointError::InvalidBounds {
                    dimension,
                    lower,
                    upper,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Get number of dimensions
    pub fn dimension(&self) -> usize {
        self.bounds.len()
    }

    /// Get bounds for a specific dimension
    pub fn get(&self, index: usize) -> Option<&Bounds> {
        self.bounds.get(index)
    }

    /// Check if all values are within bounds
    pub fn contains_vec(&self, values: &[f64]) -> bool {
        values.len() == self.bounds.len()
            && values.iter().zip(&self.bounds).all(|(&v, b)| b.contains(v))
    }
}

/// Reflect every coordinate into its bounds
pub fn map_into_bounds(values: &[f64], bounds: &MultiBounds) -> Result<Vec<f64>, SearchPointError> {
    if values.len() != bounds.dimension() {
        return Err(SearchPointError::DimensionMismatch {
            expected: bounds.dimension(),
            actual: values.len(),
        });
    }
    Ok(values
        .iter()
        .zip(&bounds.bounds)
        .map(|(&value, b)| b.reflect(value))
        .collect())
}

/// A real vector that may leave its bounds, plus the bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedSearchPoint {
    values: Vec<f64>,
    bounds: MultiBounds,
}

impl BoundedSearchPoint {
    /// Create a point, checking that values and bounds agree in dimension
    pub fn new(values: Vec<f64>, bounds: MultiBounds) -> Result<Self, SearchPointError> {
        if values.len() != bounds.dimension() {
            return Err(SearchPointError::DimensionMismatch {
                expected: bounds.dimension(),
                actual: values.len(),
            });
        }
        Ok(Self { values, bounds })
    }

    /// Create a point inside the standardized cube `[0, 10]^n`
    pub fn standardized(values: Vec<f64>) -> Self {
        let bounds = MultiBounds::uniform(Bounds::standardized(), values.len());
        Self { values, bounds }
    }

    /// Raw values, possibly outside the bounds
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The bounds
    pub fn bounds(&self) -> &MultiBounds {
        &self.bounds
    }

    /// Number of dimensions
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Values reflected into the bounds
    pub fn map_into_bounds(&self) -> Vec<f64> {
        self.values
            .iter()
            .zip(&self.bounds.bounds)
            .map(|(&value, b)| b.reflect(value))
            .collect()
    }
}

/// Affine (or log-affine) map between a parameter range and `[0, 10]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScaling {
    lower: f64,
    upper: f64,
    logarithmic: bool,
}

impl DimensionScaling {
    /// Scale `[lower, upper]` linearly
    pub fn linear(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            logarithmic: false,
        }
    }

    /// Scale `[lower, upper]` in natural-log space; both ends must be positive
    pub fn logarithmic(lower: f64, upper: f64) -> Self {
        Self {
            lower: lower.ln(),
            upper: upper.ln(),
            logarithmic: true,
        }
    }

    /// Map a parameter value into `[0, 10]`
    pub fn standardize(&self, value: f64) -> f64 {
        let value = if self.logarithmic { value.ln() } else { value };
        let range = self.upper - self.lower;
        if range == 0.0 {
            return 0.0;
        }
        STANDARDIZED_UPPER * (value - self.lower) / range
    }

    /// Map a standardized value back to parameter scale
    pub fn unstandardize(&self, standardized: f64) -> f64 {
        let value = self.lower + standardized / STANDARDIZED_UPPER * (self.upper - self.lower);
        if self.logarithmic {
            value.exp()
        } else {
            value
        }
    }
}
