//! Configuration shared by the refinement strategies

use serde::{Deserialize, Serialize};

use super::information_flow::InformationFlow;
use crate::error::OptimizationError;

/// Configuration of a continuous refinement phase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfiguration {
    /// Generations a phase runs at most
    pub maximum_number_generations: usize,
    /// Integer domains with fewer values are not continuized by
    /// differential evolution
    pub minimum_domain_size: u64,
    /// Share of the competitive population replaced after a global phase
    pub replacement_rate: f64,
    /// Search around the incumbent instead of the whole competitive population
    pub focus_on_incumbent: bool,
    /// Start CMA-ES with `initial_step_size` instead of the spread of the
    /// competitive population
    pub fix_initial_step_size: bool,
    /// Initial CMA-ES step size in standardized units
    pub initial_step_size: f64,
    /// Points per generation; engine defaults if unset
    pub population_size: Option<usize>,
}

impl Default for StrategyConfiguration {
    fn default() -> Self {
        Self {
            maximum_number_generations: 10,
            minimum_domain_size: 4,
            replacement_rate: 0.25,
            focus_on_incumbent: false,
            fix_initial_step_size: false,
            initial_step_size: 3.0,
            population_size: None,
        }
    }
}

impl StrategyConfiguration {
    /// Information flow selected by `focus_on_incumbent`
    pub fn information_flow(&self) -> InformationFlow {
        if self.focus_on_incumbent {
            InformationFlow::Local
        } else {
            InformationFlow::Global
        }
    }

    /// Check every value is inside its range
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if self.maximum_number_generations < 1 {
            return Err(OptimizationError::Configuration(
                "maximum number of generations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.replacement_rate) {
            return Err(OptimizationError::Configuration(format!(
                "replacement rate must be in [0, 1], got {}",
                self.replacement_rate
            )));
        }
        if !(self.initial_step_size > 0.0 && self.initial_step_size.is_finite()) {
            return Err(OptimizationError::Configuration(format!(
                "initial step size must be positive, got {}",
                self.initial_step_size
            )));
        }
        Ok(())
    }
}
