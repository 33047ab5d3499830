//! JADE configuration

use serde::{Deserialize, Serialize};

use crate::error::OptimizationError;

/// Smallest population current-to-pbest/1 mutation works with
pub const MINIMUM_POPULATION_SIZE: usize = 3;

/// Configuration of a JADE run
///
/// Reference: Zhang, J., Sanderson, A. C. (2009). JADE: Adaptive
/// Differential Evolution With Optional External Archive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifferentialEvolutionConfiguration {
    /// Share of the population `x_pbest` is drawn from (p)
    pub best_percentage: f64,
    /// Adaptation rate of the mean mutation factor and crossover rate (c)
    pub learning_rate: f64,
    /// Mean mutation factor of the first generation
    pub initial_mean_mutation_factor: f64,
    /// Mean crossover rate of the first generation
    pub initial_mean_crossover_rate: f64,
}

impl Default for DifferentialEvolutionConfiguration {
    fn default() -> Self {
        Self {
            best_percentage: 0.1,
            learning_rate: 0.1,
            initial_mean_mutation_factor: 0.5,
            initial_mean_crossover_rate: 0.5,
        }
    }
}

impl DifferentialEvolutionConfiguration {
    /// Create a validated configuration
    pub fn new(
        best_percentage: f64,
        learning_rate: f64,
        initial_mean_mutation_factor: f64,
        initial_mean_crossover_rate: f64,
    ) -> Result<Self, OptimizationError> {
        let configuration = Self {
            best_percentage,
            learning_rate,
            initial_mean_mutation_factor,
            initial_mean_crossover_rate,
        };
        configuration.validate()?;
        Ok(configuration)
    }

    /// Check every value is inside its range
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if !(self.best_percentage > 0.0 && self.best_percentage <= 1.0) {
            return Err(OptimizationError::Configuration(format!(
                "best percentage must be in (0, 1], got {}",
                self.best_percentage
            )));
        }
        if !(0.0..=1.0).contains(&self.learning_rate) {
            return Err(OptimizationError::Configuration(format!(
                "learning rate must be in [0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(self.initial_mean_mutation_factor > 0.0 && self.initial_mean_mutation_factor <= 1.0) {
            return Err(OptimizationError::Configuration(format!(
                "initial mean mutation factor must be in (0, 1], got {}",
                self.initial_mean_mutation_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_mean_crossover_rate) {
            return Err(OptimizationError::Configuration(format!(
                "initial mean crossover rate must be in [0, 1], got {}",
                self.initial_mean_crossover_rate
            )));
        }
        Ok(())
    }

    /// Number of points `x_pbest` is drawn from: `ceil(p * NP)`, at least one
    pub fn best_count(&self, population_size: usize) -> usize {
        ((self.best_percentage * population_size as f64).ceil() as usize).clamp(1, population_size.max(1))
    }
}
