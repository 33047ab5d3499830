//! Mutable state of a CMA-ES run

use std::path::Path;

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};

use super::configuration::CmaEsConfiguration;
use crate::checkpoint::{read_status, write_status, StatusFormat};
use crate::error::{CheckpointError, TerminationError};

const COMPONENT: &str = "cmaes_elements";

/// Smallest eigenvalue kept in the decomposition
pub const MINIMUM_EIGENVALUE: f64 = 1e-20;

const EIGEN_ITERATIONS: usize = 10_000;

/// Eigendecomposition `C = B D B^T` of the covariance matrix
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CovarianceDecomposition {
    /// Diagonal of `D`, the eigenvalues of `C`
    pub eigenvalues: DVector<f64>,
    /// Columns of `B`, the normalized eigenvectors of `C`
    pub eigenvectors: DMatrix<f64>,
}

impl CovarianceDecomposition {
    /// Decompose a covariance matrix.
    ///
    /// The matrix is symmetrized first and eigenvalues are floored at
    /// [`MINIMUM_EIGENVALUE`]. Returns `None` for non-finite matrices or if
    /// the eigen solver does not converge.
    pub fn of(covariances: &DMatrix<f64>) -> Option<Self> {
        if !covariances.iter().all(|v| v.is_finite()) {
            return None;
        }
        let symmetric = (covariances + covariances.transpose()) * 0.5;
        let eigen = SymmetricEigen::try_new(symmetric, f64::EPSILON, EIGEN_ITERATIONS)?;
        Some(Self {
            eigenvalues: eigen.eigenvalues.map(|v| v.max(MINIMUM_EIGENVALUE)),
            eigenvectors: eigen.eigenvectors,
        })
    }

    /// Identity decomposition of dimension `n`
    pub fn identity(n: usize) -> Self {
        Self {
            eigenvalues: DVector::from_element(n, 1.0),
            eigenvectors: DMatrix::identity(n, n),
        }
    }

    /// `B D^(1/2)`, which maps standard normal samples to `N(0, C)`
    pub fn sampling_transform(&self) -> DMatrix<f64> {
        let sqrt_d = self.eigenvalues.map(f64::sqrt);
        &self.eigenvectors * DMatrix::from_diagonal(&sqrt_d)
    }

    /// `C^(-1/2) = B D^(-1/2) B^T`
    pub fn inverse_square_root(&self) -> DMatrix<f64> {
        let inv_sqrt_d = self.eigenvalues.map(|v| 1.0 / v.sqrt());
        &self.eigenvectors * DMatrix::from_diagonal(&inv_sqrt_d) * self.eigenvectors.transpose()
    }

    /// Largest eigenvalue
    pub fn max_eigenvalue(&self) -> f64 {
        self.eigenvalues.max()
    }

    /// Smallest eigenvalue
    pub fn min_eigenvalue(&self) -> f64 {
        self.eigenvalues.min()
    }
}

/// Internal state of one CMA-ES run
///
/// Fields stay `None` until the run is initialized; termination criteria
/// report an incomplete state instead of guessing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CmaEsElements {
    /// Static configuration of the run
    pub configuration: Option<CmaEsConfiguration>,
    /// Completed generations
    pub generation: usize,
    /// Mean of the search distribution (m)
    pub distribution_mean: Option<DVector<f64>>,
    /// Global step size (σ)
    pub step_size: Option<f64>,
    /// Covariance matrix (C)
    pub covariances: Option<DMatrix<f64>>,
    /// Eigendecomposition of the covariance matrix
    pub covariances_decomposition: Option<CovarianceDecomposition>,
    /// Evolution path for C adaptation (p_c)
    pub evolution_path: Option<DVector<f64>>,
    /// Conjugate evolution path for σ adaptation (p_σ)
    pub conjugate_evolution_path: Option<DVector<f64>>,
}

impl CmaEsElements {
    /// State at generation 0 of a run
    pub fn initial(configuration: CmaEsConfiguration) -> Self {
        let n = configuration.search_space_dimension();
        Self {
            generation: 0,
            distribution_mean: Some(configuration.initial_distribution_mean().clone()),
            step_size: Some(configuration.initial_step_size()),
            covariances: Some(DMatrix::identity(n, n)),
            covariances_decomposition: Some(CovarianceDecomposition::identity(n)),
            evolution_path: Some(DVector::zeros(n)),
            conjugate_evolution_path: Some(DVector::zeros(n)),
            configuration: Some(configuration),
        }
    }

    /// Whether every field is populated
    pub fn is_complete(&self) -> bool {
        self.configuration.is_some()
            && self.distribution_mean.is_some()
            && self.step_size.is_some()
            && self.covariances.is_some()
            && self.covariances_decomposition.is_some()
            && self.evolution_path.is_some()
            && self.conjugate_evolution_path.is_some()
    }

    /// Check that a complete state describes an `n`-dimensional run.
    ///
    /// Vectors must have length `n`, matrices must be `n x n` and the step
    /// size must be positive. Deserialized states go through this before
    /// the engine touches them.
    pub fn check_consistency(&self, n: usize) -> Result<(), CheckpointError> {
        let incompatible = |what: &str, found: String| {
            CheckpointError::Incompatible(format!(
                "{} has dimension {}, search space has {}",
                what, found, n
            ))
        };
        let configuration = self
            .configuration
            .as_ref()
            .ok_or_else(|| CheckpointError::Incompatible("configuration is missing".to_string()))?;
        configuration
            .validate()
            .map_err(|e| CheckpointError::Incompatible(e.to_string()))?;
        if configuration.search_space_dimension() != n {
            return Err(incompatible(
                "configured distribution mean",
                configuration.search_space_dimension().to_string(),
            ));
        }

        let vectors = [
            ("distribution mean", &self.distribution_mean),
            ("evolution path", &self.evolution_path),
            ("conjugate evolution path", &self.conjugate_evolution_path),
        ];
        for (what, vector) in vectors {
            match vector {
                Some(v) if v.len() == n => {}
                Some(v) => return Err(incompatible(what, v.len().to_string())),
                None => return Err(CheckpointError::Incompatible(format!("{} is missing", what))),
            }
        }

        let square = |what: &str, m: &DMatrix<f64>| {
            if m.nrows() == n && m.ncols() == n {
                Ok(())
            } else {
                Err(incompatible(what, format!("{}x{}", m.nrows(), m.ncols())))
            }
        };
        let covariances = self
            .covariances
            .as_ref()
            .ok_or_else(|| CheckpointError::Incompatible("covariances are missing".to_string()))?;
        square("covariance matrix", covariances)?;
        let decomposition = self.covariances_decomposition.as_ref().ok_or_else(|| {
            CheckpointError::Incompatible("covariances decomposition is missing".to_string())
        })?;
        square("eigenvector matrix", &decomposition.eigenvectors)?;
        if decomposition.eigenvalues.len() != n {
            return Err(incompatible(
                "eigenvalue vector",
                decomposition.eigenvalues.len().to_string(),
            ));
        }

        match self.step_size {
            Some(step_size) if step_size > 0.0 && step_size.is_finite() => Ok(()),
            Some(step_size) => Err(CheckpointError::Incompatible(format!(
                "step size must be positive, got {}",
                step_size
            ))),
            None => Err(CheckpointError::Incompatible("step size is missing".to_string())),
        }
    }

    /// Configuration, or an incomplete-state error
    pub fn require_configuration(&self) -> Result<&CmaEsConfiguration, TerminationError> {
        self.configuration
            .as_ref()
            .ok_or(TerminationError::IncompleteState("configuration"))
    }

    /// Distribution mean, or an incomplete-state error
    pub fn require_distribution_mean(&self) -> Result<&DVector<f64>, TerminationError> {
        self.distribution_mean
            .as_ref()
            .ok_or(TerminationError::IncompleteState("distribution mean"))
    }

    /// Step size, or an incomplete-state error
    pub fn require_step_size(&self) -> Result<f64, TerminationError> {
        self.step_size
            .ok_or(TerminationError::IncompleteState("step size"))
    }

    /// Covariance matrix, or an incomplete-state error
    pub fn require_covariances(&self) -> Result<&DMatrix<f64>, TerminationError> {
        self.covariances
            .as_ref()
            .ok_or(TerminationError::IncompleteState("covariances"))
    }

    /// Covariance decomposition, or an incomplete-state error
    pub fn require_decomposition(&self) -> Result<&CovarianceDecomposition, TerminationError> {
        self.covariances_decomposition
            .as_ref()
            .ok_or(TerminationError::IncompleteState("covariances decomposition"))
    }

    /// Write the state to a status file
    pub fn write_to_file(
        &self,
        path: impl AsRef<Path>,
        format: StatusFormat,
    ) -> Result<(), CheckpointError> {
        write_status(path, COMPONENT, self, format)
    }

    /// Read a state written by [`write_to_file`](Self::write_to_file)
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        read_status(path, COMPONENT)
    }
}
