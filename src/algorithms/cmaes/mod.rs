//! CMA-ES (Covariance Matrix Adaptation Evolution Strategy)
//!
//! Implements the CMA-ES algorithm with full covariance matrix adaptation,
//! evolution path management, and cumulative step-size control, over the
//! search points of a [`SearchPointFactory`].
//!
//! The engine never evaluates anything itself: each generation it samples
//! candidate vectors, turns them into points, and asks a
//! [`SearchPointSorter`] to rank them.
//!
//! Reference: Hansen, N. (2016). The CMA Evolution Strategy: A Tutorial.

pub mod configuration;
pub mod elements;

use std::path::Path;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use configuration::{CmaEsConfiguration, CmaEsParameters};
pub use elements::{CmaEsElements, CovarianceDecomposition};

use crate::checkpoint::{read_status, write_status, StatusFormat};
use crate::error::{CheckpointError, OptimizationError, TuneResult};
use crate::search_point::{SearchPoint, SearchPointFactory};
use crate::sorting::{validate_ranking, SearchPointSorter};
use crate::termination::{AnyOf, TerminationCriterion};

const COMPONENT: &str = "cmaes";

/// Serializable status of a CMA-ES run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CmaEsStatus<P> {
    /// Distribution state
    pub elements: CmaEsElements,
    /// Points of the last generation, best first
    pub sorted_population: Vec<P>,
}

/// CMA-ES optimizer
///
/// The factory must be able to create points without a parent point.
pub struct CmaEs<F: SearchPointFactory> {
    factory: F,
    elements: CmaEsElements,
    parameters: Option<CmaEsParameters>,
    termination: AnyOf,
    sorted_population: Vec<F::Point>,
}

impl<F: SearchPointFactory> CmaEs<F> {
    /// Create an uninitialized optimizer
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            elements: CmaEsElements::default(),
            parameters: None,
            termination: AnyOf::default(),
            sorted_population: Vec::new(),
        }
    }

    /// Start a new run: generation 0, configured mean and step size,
    /// identity covariance
    pub fn initialize(
        &mut self,
        configuration: CmaEsConfiguration,
        termination_criteria: Vec<Box<dyn TerminationCriterion>>,
    ) -> TuneResult<()> {
        self.check_dimension(&configuration)?;
        info!(
            dimension = configuration.search_space_dimension(),
            population_size = configuration.population_size(),
            step_size = configuration.initial_step_size(),
            "initializing CMA-ES"
        );

        self.parameters = Some(CmaEsParameters::new(&configuration));
        self.elements = CmaEsElements::initial(configuration);
        self.termination = AnyOf::new(termination_criteria);
        self.sorted_population.clear();
        Ok(())
    }

    /// Whether [`initialize`](Self::initialize) or
    /// [`use_status_dump`](Self::use_status_dump) has been called
    pub fn is_initialized(&self) -> bool {
        self.parameters.is_some() && self.elements.is_complete()
    }

    /// Current distribution state
    pub fn elements(&self) -> &CmaEsElements {
        &self.elements
    }

    /// The point factory
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Completed generations
    pub fn generation(&self) -> usize {
        self.elements.generation
    }

    /// Points of the last generation, best first
    pub fn sorted_population(&self) -> &[F::Point] {
        &self.sorted_population
    }

    /// Best point of the last generation
    pub fn best_point(&self) -> Option<&F::Point> {
        self.sorted_population.first()
    }

    /// Whether any registered termination criterion is met
    pub fn any_termination_criterion_met(&self) -> TuneResult<bool> {
        if !self.is_initialized() {
            return Err(OptimizationError::NotInitialized.into());
        }
        Ok(self.termination.is_met(&self.elements)?)
    }

    /// Reason of the first met termination criterion
    pub fn termination_reason(&self) -> TuneResult<Option<&'static str>> {
        Ok(self
            .termination
            .first_met(&self.elements)?
            .map(|criterion| criterion.reason()))
    }

    /// Sample, rank and adapt once.
    ///
    /// Returns `true` if a termination criterion is met afterwards.
    pub fn next_generation<S, R>(&mut self, sorter: &mut S, rng: &mut R) -> TuneResult<bool>
    where
        S: SearchPointSorter<F::Point>,
        R: Rng,
    {
        let parameters = self
            .parameters
            .clone()
            .ok_or(OptimizationError::NotInitialized)?;
        if !self.elements.is_complete() {
            return Err(OptimizationError::NotInitialized.into());
        }

        let points = self.sample_points(rng)?;
        let ranking = sorter.sort(&points)?;
        if let Err(e) = validate_ranking(&ranking, points.len()) {
            warn!(error = %e, "sorter returned an invalid ranking");
            return Err(e.into());
        }

        let mut slots: Vec<Option<F::Point>> = points.into_iter().map(Some).collect();
        let sorted: Vec<F::Point> = ranking
            .iter()
            .filter_map(|&index| slots[index].take())
            .collect();

        self.update(&parameters, &sorted)?;
        self.sorted_population = sorted;

        let terminated = self.any_termination_criterion_met()?;
        debug!(
            generation = self.elements.generation,
            step_size = self.elements.step_size.unwrap_or(f64::NAN),
            repaired = self.sorted_population.iter().filter(|p| p.is_repaired()).count(),
            "CMA-ES generation finished"
        );
        if terminated {
            info!(
                generation = self.elements.generation,
                reason = self.termination_reason()?.unwrap_or("unknown"),
                "CMA-ES terminated"
            );
        }
        Ok(terminated)
    }

    fn check_dimension(&self, configuration: &CmaEsConfiguration) -> TuneResult<()> {
        if configuration.search_space_dimension() != self.factory.dimension() {
            return Err(OptimizationError::Configuration(format!(
                "distribution mean has dimension {}, search space has {}",
                configuration.search_space_dimension(),
                self.factory.dimension()
            ))
            .into());
        }
        Ok(())
    }

    /// Draw `λ` points from `N(m, σ² C)`
    fn sample_points<R: Rng>(&self, rng: &mut R) -> TuneResult<Vec<F::Point>> {
        let configuration = self.elements.require_configuration()?;
        let mean = self.elements.require_distribution_mean()?;
        let step_size = self.elements.require_step_size()?;
        let transform = self.elements.require_decomposition()?.sampling_transform();
        let n = mean.len();

        (0..configuration.population_size())
            .map(|_| {
                let z: DVector<f64> =
                    DVector::from_iterator(n, (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)));
                let x: DVector<f64> = mean + (&transform * z) * step_size;
                self.factory.create(x.as_slice().to_vec(), None)
            })
            .collect()
    }

    /// Update mean, paths, covariance, step size and decomposition
    fn update(&mut self, parameters: &CmaEsParameters, sorted: &[F::Point]) -> TuneResult<()> {
        let elements = &mut self.elements;
        let (
            Some(mean),
            Some(step_size),
            Some(covariances),
            Some(decomposition),
            Some(p_c),
            Some(p_sigma),
        ) = (
            elements.distribution_mean.as_ref(),
            elements.step_size,
            elements.covariances.as_ref(),
            elements.covariances_decomposition.as_ref(),
            elements.evolution_path.as_ref(),
            elements.conjugate_evolution_path.as_ref(),
        )
        else {
            return Err(OptimizationError::NotInitialized.into());
        };
        let n = mean.len();

        // Steps of the selected points: y_k = (x_k - m) / σ
        let steps: Vec<DVector<f64>> = sorted
            .iter()
            .take(parameters.mu)
            .map(|point| (DVector::from_column_slice(point.values()) - mean) / step_size)
            .collect();

        let mut y_w: DVector<f64> = DVector::zeros(n);
        for (weight, y) in parameters.weights.iter().zip(&steps) {
            y_w += y * *weight;
        }

        // Step-size path
        let c_sigma = parameters.c_sigma;
        let p_sigma = p_sigma * (1.0 - c_sigma)
            + decomposition.inverse_square_root() * &y_w
                * (c_sigma * (2.0 - c_sigma) * parameters.mu_eff).sqrt();
        let p_sigma_norm = p_sigma.norm();

        // Stall indicator for the rank-one path
        let generation = elements.generation as i32 + 1;
        let h_sigma = if p_sigma_norm / (1.0 - (1.0 - c_sigma).powi(2 * generation)).sqrt()
            < (1.4 + 2.0 / (n as f64 + 1.0)) * parameters.chi_n
        {
            1.0
        } else {
            0.0
        };

        // Covariance path
        let c_c = parameters.c_c;
        let p_c = p_c * (1.0 - c_c)
            + &y_w * (h_sigma * (c_c * (2.0 - c_c) * parameters.mu_eff).sqrt());

        // Covariance: decay, rank-one and rank-μ updates
        let delta_h = (1.0 - h_sigma) * c_c * (2.0 - c_c);
        let mut rank_mu: DMatrix<f64> = DMatrix::zeros(n, n);
        for (weight, y) in parameters.weights.iter().zip(&steps) {
            rank_mu += (y * y.transpose()) * *weight;
        }
        let decay = 1.0 - parameters.c_1 - parameters.c_mu + delta_h * parameters.c_1;
        let mut covariances = covariances * decay
            + (&p_c * p_c.transpose()) * parameters.c_1
            + rank_mu * parameters.c_mu;
        covariances = (&covariances + covariances.transpose()) * 0.5;

        let mean = mean + &y_w * step_size;
        let step_size = step_size
            * ((c_sigma / parameters.d_sigma) * (p_sigma_norm / parameters.chi_n - 1.0)).exp();

        let decomposition = CovarianceDecomposition::of(&covariances).ok_or_else(|| {
            OptimizationError::NumericalFailure(format!(
                "covariance matrix could not be decomposed in generation {}",
                elements.generation
            ))
        })?;
        if !step_size.is_finite() || !mean.iter().all(|v| v.is_finite()) {
            return Err(OptimizationError::NumericalFailure(format!(
                "distribution diverged in generation {}",
                elements.generation
            ))
            .into());
        }

        elements.distribution_mean = Some(mean);
        elements.step_size = Some(step_size);
        elements.covariances = Some(covariances);
        elements.covariances_decomposition = Some(decomposition);
        elements.evolution_path = Some(p_c);
        elements.conjugate_evolution_path = Some(p_sigma);
        elements.generation += 1;
        Ok(())
    }

    /// Snapshot of the run state
    pub fn status(&self) -> CmaEsStatus<F::Point> {
        CmaEsStatus {
            elements: self.elements.clone(),
            sorted_population: self.sorted_population.clone(),
        }
    }

    /// Continue a run from a snapshot taken by [`status`](Self::status)
    pub fn restore(
        &mut self,
        status: CmaEsStatus<F::Point>,
        termination_criteria: Vec<Box<dyn TerminationCriterion>>,
    ) -> TuneResult<()> {
        let Some(configuration) = status.elements.configuration.clone() else {
            return Err(CheckpointError::Incompatible(
                "CMA-ES state lacks a configuration".to_string(),
            )
            .into());
        };
        if !status.elements.is_complete() {
            return Err(
                CheckpointError::Incompatible("CMA-ES state is incomplete".to_string()).into(),
            );
        }
        self.check_dimension(&configuration)?;
        status.elements.check_consistency(self.factory.dimension())?;
        let n = self.factory.dimension();
        if let Some(point) = status.sorted_population.iter().find(|p| p.values().len() != n) {
            return Err(CheckpointError::Incompatible(format!(
                "sorted population holds a point of dimension {}, search space has {}",
                point.values().len(),
                n
            ))
            .into());
        }

        info!(generation = status.elements.generation, "resuming CMA-ES");
        self.parameters = Some(CmaEsParameters::new(&configuration));
        self.elements = status.elements;
        self.sorted_population = status.sorted_population;
        self.termination = AnyOf::new(termination_criteria);
        Ok(())
    }

    /// Write the run state to a status file
    pub fn dump_status(&self, path: impl AsRef<Path>, format: StatusFormat) -> TuneResult<()> {
        write_status(path, COMPONENT, &self.status(), format)?;
        Ok(())
    }

    /// Continue a run from a status file written by
    /// [`dump_status`](Self::dump_status)
    pub fn use_status_dump(
        &mut self,
        path: impl AsRef<Path>,
        termination_criteria: Vec<Box<dyn TerminationCriterion>>,
    ) -> TuneResult<()> {
        let status: CmaEsStatus<F::Point> = read_status(path, COMPONENT)?;
        self.restore(status, termination_criteria)
    }
}
