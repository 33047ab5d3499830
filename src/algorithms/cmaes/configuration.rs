//! Static CMA-ES configuration and derived strategy parameters

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::OptimizationError;

/// Configuration of one CMA-ES run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CmaEsConfiguration {
    population_size: usize,
    initial_distribution_mean: DVector<f64>,
    initial_step_size: f64,
}

impl CmaEsConfiguration {
    /// Create a configuration.
    ///
    /// The population size must be at least 2, the step size positive and
    /// the mean non-empty.
    pub fn new(
        population_size: usize,
        initial_distribution_mean: Vec<f64>,
        initial_step_size: f64,
    ) -> Result<Self, OptimizationError> {
        let configuration = Self {
            population_size,
            initial_distribution_mean: DVector::from_vec(initial_distribution_mean),
            initial_step_size,
        };
        configuration.validate()?;
        Ok(configuration)
    }

    /// Check the constraints [`new`](Self::new) enforces, for configurations
    /// that were deserialized instead
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if self.population_size < 2 {
            return Err(OptimizationError::Configuration(format!(
                "population size must be at least 2, got {}",
                self.population_size
            )));
        }
        if !(self.initial_step_size > 0.0) || !self.initial_step_size.is_finite() {
            return Err(OptimizationError::Configuration(format!(
                "initial step size must be positive, got {}",
                self.initial_step_size
            )));
        }
        if self.initial_distribution_mean.is_empty() {
            return Err(OptimizationError::Configuration(
                "initial distribution mean must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Recommended population size for a search space dimension:
    /// `4 + floor(3 ln n)`
    pub fn default_population_size(dimension: usize) -> usize {
        4 + (3.0 * (dimension.max(1) as f64).ln()).floor() as usize
    }

    /// Number of points sampled per generation (λ)
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Mean the distribution starts at
    pub fn initial_distribution_mean(&self) -> &DVector<f64> {
        &self.initial_distribution_mean
    }

    /// Step size the distribution starts with (σ₀)
    pub fn initial_step_size(&self) -> f64 {
        self.initial_step_size
    }

    /// Search space dimension (n)
    pub fn search_space_dimension(&self) -> usize {
        self.initial_distribution_mean.len()
    }
}

/// Strategy parameters derived from the configuration
///
/// Follows Hansen, N. (2016). The CMA Evolution Strategy: A Tutorial.
#[derive(Clone, Debug, PartialEq)]
pub struct CmaEsParameters {
    /// Parent number (μ)
    pub mu: usize,
    /// Positive recombination weights, decreasing, summing to 1
    pub weights: DVector<f64>,
    /// Variance effective selection mass (μ_eff)
    pub mu_eff: f64,
    /// Learning rate for cumulation for σ control
    pub c_sigma: f64,
    /// Damping for σ
    pub d_sigma: f64,
    /// Learning rate for cumulation for C
    pub c_c: f64,
    /// Learning rate for rank-1 update
    pub c_1: f64,
    /// Learning rate for rank-μ update
    pub c_mu: f64,
    /// Expected length of random vector ||N(0, I)||
    pub chi_n: f64,
}

impl CmaEsParameters {
    /// Derive the strategy parameters
    pub fn new(configuration: &CmaEsConfiguration) -> Self {
        let n = configuration.search_space_dimension() as f64;
        let lambda = configuration.population_size();
        let mu = (lambda / 2).max(1);

        // Log-linear weights
        let mut weights = DVector::from_iterator(
            mu,
            (0..mu).map(|i| ((lambda as f64 + 1.0) / 2.0).ln() - ((i + 1) as f64).ln()),
        );
        let weight_sum = weights.sum();
        weights /= weight_sum;

        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        // Time constants for cumulation
        let c_sigma = (mu_eff + 2.0) / (n + mu_eff + 5.0);
        let c_c = (4.0 + mu_eff / n) / (n + 4.0 + 2.0 * mu_eff / n);

        // Learning rates for covariance matrix update
        let c_1 = 2.0 / ((n + 1.3).powi(2) + mu_eff);
        let alpha_mu = 2.0;
        let c_mu = (alpha_mu * (mu_eff - 2.0 + 1.0 / mu_eff))
            / ((n + 2.0).powi(2) + alpha_mu * mu_eff / 2.0);
        let c_mu = c_mu.clamp(0.0, 1.0 - c_1);

        let d_sigma = 1.0 + 2.0 * (((mu_eff - 1.0) / (n + 1.0)).sqrt() - 1.0).max(0.0) + c_sigma;

        let chi_n = n.sqrt() * (1.0 - 1.0 / (4.0 * n) + 1.0 / (21.0 * n * n));

        Self {
            mu,
            weights,
            mu_eff,
            c_sigma,
            d_sigma,
            c_c,
            c_1,
            c_mu,
            chi_n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_configuration_validation() {
        assert!(CmaEsConfiguration::new(2, vec![0.0], 1.0).is_ok());
        assert!(CmaEsConfiguration::new(1, vec![0.0], 1.0).is_err());
        assert!(CmaEsConfiguration::new(4, vec![0.0], 0.0).is_err());
        assert!(CmaEsConfiguration::new(4, vec![0.0], f64::NAN).is_err());
        assert!(CmaEsConfiguration::new(4, vec![], 1.0).is_err());
    }

    #[test]
    fn test_default_population_size() {
        assert_eq!(CmaEsConfiguration::default_population_size(1), 4);
        assert_eq!(CmaEsConfiguration::default_population_size(3), 7);
        assert_eq!(CmaEsConfiguration::default_population_size(10), 10);
    }

    #[test]
    fn test_weights_sum_to_one_and_decrease() {
        let configuration = CmaEsConfiguration::new(10, vec![0.0; 10], 1.0).unwrap();
        let parameters = CmaEsParameters::new(&configuration);

        assert_eq!(parameters.mu, 5);
        assert_relative_eq!(parameters.weights.sum(), 1.0, epsilon = 1e-12);
        for i in 1..parameters.mu {
            assert!(parameters.weights[i] < parameters.weights[i - 1]);
        }
        assert!(parameters.mu_eff > 1.0 && parameters.mu_eff < parameters.mu as f64);
    }

    #[test]
    fn test_learning_rates_are_bounded() {
        for (lambda, n) in [(2, 1), (4, 2), (12, 5), (50, 30)] {
            let configuration = CmaEsConfiguration::new(lambda, vec![0.0; n], 1.0).unwrap();
            let p = CmaEsParameters::new(&configuration);
            assert!(p.c_1 + p.c_mu <= 1.0 + 1e-12);
            assert!(p.c_mu >= 0.0);
            assert!(p.c_sigma > 0.0 && p.c_sigma < 1.0);
            assert!(p.c_c > 0.0 && p.c_c <= 1.0);
            assert!(p.d_sigma >= 1.0);
        }
    }
}
