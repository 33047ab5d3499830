//! Termination criteria
//!
//! This module provides the stopping rules of a CMA-ES run. Each criterion
//! is a pure function of the current [`CmaEsElements`]; evaluating one on a
//! state that is missing what it needs is an error, not `false`.
//!
//! Thresholds follow Hansen, N. (2009). Benchmarking a BI-population CMA-ES
//! on the BBOB-2009 function testbed.

use std::fmt::Debug;

use crate::algorithms::cmaes::elements::CmaEsElements;
use crate::error::TerminationError;

/// Termination criterion trait
pub trait TerminationCriterion: Send + Sync + Debug {
    /// Check if the run should terminate
    fn is_met(&self, elements: &CmaEsElements) -> Result<bool, TerminationError>;

    /// Get a description of why termination occurred
    fn reason(&self) -> &'static str;
}

/// Terminate after a maximum number of generations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaxIterations(usize);

impl MaxIterations {
    /// Create a new max iterations criterion; `max` must be at least 1
    pub fn new(max: usize) -> Result<Self, TerminationError> {
        if max < 1 {
            return Err(TerminationError::InvalidArgument(format!(
                "maximum number of iterations must be positive, got {}",
                max
            )));
        }
        Ok(Self(max))
    }

    /// The generation cap
    pub fn max(&self) -> usize {
        self.0
    }
}

impl TerminationCriterion for MaxIterations {
    fn is_met(&self, elements: &CmaEsElements) -> Result<bool, TerminationError> {
        Ok(elements.generation >= self.0)
    }

    fn reason(&self) -> &'static str {
        "Maximum iterations reached"
    }
}

/// Terminate when the condition number of the covariance matrix exceeds `1e14`
#[derive(Clone, Debug, Default)]
pub struct ConditionCov;

impl ConditionCov {
    /// Threshold on the condition number
    pub const MAXIMUM_CONDITION: f64 = 1e14;
}

impl TerminationCriterion for ConditionCov {
    fn is_met(&self, elements: &CmaEsElements) -> Result<bool, TerminationError> {
        let covariances = elements
            .covariances
            .as_ref()
            .ok_or(TerminationError::MissingCovariance)?;

        if !covariances.iter().all(|v| v.is_finite()) {
            return Ok(true);
        }
        let eigenvalues = covariances.clone().symmetric_eigenvalues();
        let (min, max) = (eigenvalues.min(), eigenvalues.max());
        if min <= 0.0 {
            return Ok(true);
        }
        Ok(max / min > Self::MAXIMUM_CONDITION)
    }

    fn reason(&self) -> &'static str {
        "Covariance matrix ill-conditioned"
    }
}

/// Terminate when adding a tenth of a principal axis to the mean has no
/// numerical effect
///
/// The axis is chosen as `generation mod n`. The comparison is exact.
#[derive(Clone, Debug, Default)]
pub struct NoEffectAxis;

impl TerminationCriterion for NoEffectAxis {
    fn is_met(&self, elements: &CmaEsElements) -> Result<bool, TerminationError> {
        let mean = elements.require_distribution_mean()?;
        let step_size = elements.require_step_size()?;
        let decomposition = elements.require_decomposition()?;

        let n = mean.len();
        if n == 0 {
            return Ok(false);
        }
        let axis = elements.generation % n;
        let scale = 0.1 * step_size * decomposition.eigenvalues[axis].sqrt();
        let direction = decomposition.eigenvectors.column(axis);

        #[allow(clippy::float_cmp)]
        let unchanged = mean
            .iter()
            .zip(direction.iter())
            .all(|(&m, &b)| m + scale * b == m);
        Ok(unchanged)
    }

    fn reason(&self) -> &'static str {
        "Principal axis step has no effect on the mean"
    }
}

/// Terminate when adding a fifth of a coordinate's standard deviation to
/// the mean has no numerical effect in any coordinate
///
/// Uses `0.2 * sigma * C[i, i]`. The comparison is exact.
#[derive(Clone, Debug, Default)]
pub struct NoEffectCoord;

impl TerminationCriterion for NoEffectCoord {
    fn is_met(&self, elements: &CmaEsElements) -> Result<bool, TerminationError> {
        let mean = elements.require_distribution_mean()?;
        let step_size = elements.require_step_size()?;
        let covariances = elements.require_covariances()?;

        #[allow(clippy::float_cmp)]
        let any_unchanged = mean
            .iter()
            .enumerate()
            .any(|(i, &m)| m + 0.2 * step_size * covariances[(i, i)] == m);
        Ok(any_unchanged)
    }

    fn reason(&self) -> &'static str {
        "Coordinate step has no effect on the mean"
    }
}

/// Terminate when the step size grew by more than `1e4 * sqrt(max eigenvalue)`
/// relative to the initial step size
#[derive(Clone, Debug, Default)]
pub struct TolUpSigma;

impl TolUpSigma {
    /// Allowed growth factor
    pub const TOLERANCE: f64 = 1e4;
}

impl TerminationCriterion for TolUpSigma {
    fn is_met(&self, elements: &CmaEsElements) -> Result<bool, TerminationError> {
        let configuration = elements.require_configuration()?;
        let step_size = elements.require_step_size()?;
        let decomposition = elements.require_decomposition()?;

        let growth = step_size / configuration.initial_step_size();
        Ok(growth > Self::TOLERANCE * decomposition.max_eigenvalue().sqrt())
    }

    fn reason(&self) -> &'static str {
        "Step size diverged"
    }
}

/// Combine criteria with OR logic (any one triggers termination)
#[derive(Debug, Default)]
pub struct AnyOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AnyOf {
    /// Create a new AnyOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }

    /// First criterion that is met, if any
    pub fn first_met(
        &self,
        elements: &CmaEsElements,
    ) -> Result<Option<&dyn TerminationCriterion>, TerminationError> {
        for criterion in &self.criteria {
            if criterion.is_met(elements)? {
                return Ok(Some(criterion.as_ref()));
            }
        }
        Ok(None)
    }

    /// Number of combined criteria
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Whether no criteria are combined
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl TerminationCriterion for AnyOf {
    fn is_met(&self, elements: &CmaEsElements) -> Result<bool, TerminationError> {
        Ok(self.first_met(elements)?.is_some())
    }

    fn reason(&self) -> &'static str {
        "One of multiple criteria met"
    }
}

/// The generation cap plus every numerical stopping rule
pub fn default_termination_criteria(
    maximum_generations: usize,
) -> Result<Vec<Box<dyn TerminationCriterion>>, TerminationError> {
    Ok(vec![
        Box::new(MaxIterations::new(maximum_generations)?),
        Box::new(ConditionCov),
        Box::new(NoEffectAxis),
        Box::new(NoEffectCoord),
        Box::new(TolUpSigma),
    ])
}

pub mod prelude {
    pub use super::{
        default_termination_criteria, AnyOf, ConditionCov, MaxIterations, NoEffectAxis,
        NoEffectCoord, TerminationCriterion, TolUpSigma,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::cmaes::configuration::CmaEsConfiguration;
    use crate::algorithms::cmaes::elements::CovarianceDecomposition;
    use nalgebra::{DMatrix, DVector};

    fn elements(mean: Vec<f64>, step_size: f64) -> CmaEsElements {
        let configuration = CmaEsConfiguration::new(4, mean, step_size).unwrap();
        CmaEsElements::initial(configuration)
    }

    fn with_covariances(mut elements: CmaEsElements, c: DMatrix<f64>) -> CmaEsElements {
        elements.covariances_decomposition = CovarianceDecomposition::of(&c);
        elements.covariances = Some(c);
        elements
    }

    #[test]
    fn test_max_iterations() {
        let criterion = MaxIterations::new(5).unwrap();
        let mut state = elements(vec![0.0], 1.0);
        for generation in 0..10 {
            state.generation = generation;
            assert_eq!(criterion.is_met(&state).unwrap(), generation >= 5);
        }
    }

    #[test]
    fn test_max_iterations_rejects_zero() {
        assert!(matches!(
            MaxIterations::new(0),
            Err(TerminationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_max_iterations_on_incomplete_state() {
        let criterion = MaxIterations::new(1).unwrap();
        assert!(!criterion.is_met(&CmaEsElements::default()).unwrap());
    }

    #[test]
    fn test_condition_cov() {
        let state = elements(vec![0.0, 0.0], 1.0);
        assert!(!ConditionCov.is_met(&state).unwrap());

        let c = DMatrix::from_diagonal(&DVector::from_vec(vec![1e15, 1.0]));
        let state = with_covariances(state, c);
        assert!(ConditionCov.is_met(&state).unwrap());

        let c = DMatrix::from_diagonal(&DVector::from_vec(vec![1e13, 1.0]));
        let state = with_covariances(elements(vec![0.0, 0.0], 1.0), c);
        assert!(!ConditionCov.is_met(&state).unwrap());
    }

    #[test]
    fn test_condition_cov_without_covariances() {
        let mut state = elements(vec![0.0], 1.0);
        state.covariances = None;
        assert_eq!(
            ConditionCov.is_met(&state),
            Err(TerminationError::MissingCovariance)
        );
    }

    #[test]
    fn test_no_effect_axis() {
        let state = elements(vec![1.0, 1.0], 1.0);
        assert!(!NoEffectAxis.is_met(&state).unwrap());

        let mut state = elements(vec![1.0, 1.0], 1e-17);
        assert!(NoEffectAxis.is_met(&state).unwrap());

        // Only the axis of the current generation counts
        state.step_size = Some(1e-8);
        let c = DMatrix::from_diagonal(&DVector::from_vec(vec![1e-16, 1.0]));
        let mut state = with_covariances(state, c);
        state.generation = 0;
        let first_axis_small = state
            .covariances_decomposition
            .as_ref()
            .unwrap()
            .eigenvalues[0]
            < 1e-10;
        assert_eq!(NoEffectAxis.is_met(&state).unwrap(), first_axis_small);
        state.generation = 1;
        assert_eq!(NoEffectAxis.is_met(&state).unwrap(), !first_axis_small);
    }

    #[test]
    fn test_no_effect_coord() {
        let state = elements(vec![1.0, 1.0], 1.0);
        assert!(!NoEffectCoord.is_met(&state).unwrap());

        let c = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 1e-20]));
        let state = with_covariances(elements(vec![1.0, 1.0], 1.0), c);
        assert!(NoEffectCoord.is_met(&state).unwrap());

        // Zero mean coordinates always register a positive shift
        let c = DMatrix::from_diagonal(&DVector::from_vec(vec![1e-20, 1e-20]));
        let state = with_covariances(elements(vec![0.0, 0.0], 1.0), c);
        assert!(!NoEffectCoord.is_met(&state).unwrap());
    }

    #[test]
    fn test_tol_up_sigma() {
        let mut state = elements(vec![0.0, 0.0], 0.5);
        assert!(!TolUpSigma.is_met(&state).unwrap());

        state.step_size = Some(0.5 * 2e4);
        assert!(TolUpSigma.is_met(&state).unwrap());

        let c = DMatrix::from_diagonal(&DVector::from_vec(vec![16.0, 1.0]));
        let state = with_covariances(state, c);
        assert!(!TolUpSigma.is_met(&state).unwrap());
    }

    #[test]
    fn test_incomplete_state_is_an_error() {
        let state = CmaEsElements::default();
        assert!(matches!(
            NoEffectAxis.is_met(&state),
            Err(TerminationError::IncompleteState(_))
        ));
        assert!(matches!(
            NoEffectCoord.is_met(&state),
            Err(TerminationError::IncompleteState(_))
        ));
        assert!(matches!(
            TolUpSigma.is_met(&state),
            Err(TerminationError::IncompleteState(_))
        ));
    }

    #[test]
    fn test_any_of() {
        let criterion = AnyOf::new(default_termination_criteria(3).unwrap());
        assert_eq!(criterion.len(), 5);

        let mut state = elements(vec![1.0, 2.0], 1.0);
        assert!(criterion.first_met(&state).unwrap().is_none());

        state.generation = 3;
        let met = criterion.first_met(&state).unwrap().unwrap();
        assert_eq!(met.reason(), "Maximum iterations reached");
        assert!(criterion.is_met(&state).unwrap());
    }
}
