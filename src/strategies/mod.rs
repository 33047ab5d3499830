//! Refinement strategies
//!
//! A strategy runs one phase of continuous optimization on behalf of the
//! outer genetic algorithm: it derives the engine's start from the genetic
//! population, advances the engine generation by generation, and writes the
//! result back into the competitive population.

pub mod cmaes;
pub mod configuration;
pub mod differential_evolution;
pub mod information_flow;
pub mod population;

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::checkpoint::StatusFormat;
use crate::error::TuneResult;
use crate::genome::genome::Genome;
use crate::search_point::SearchPoint;
use crate::sorting::SearchPointSorter;

pub use self::cmaes::CmaEsStrategy;
pub use self::configuration::StrategyConfiguration;
pub use self::differential_evolution::DifferentialEvolutionStrategy;
pub use self::information_flow::InformationFlow;
pub use self::population::Population;

/// What a running phase remembers of the population it started from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseContext {
    /// Population at phase start
    pub population: Population,
    /// Incumbent at phase start
    pub incumbent: Option<Genome>,
}

/// One phase of continuous refinement of a genetic population
pub trait ContinuousOptimizationStrategy {
    /// Search points of the underlying engine
    type Point: SearchPoint;

    /// Start a phase from the genetic population
    fn initialize<R: Rng>(
        &mut self,
        population: Population,
        incumbent: Option<Genome>,
        rng: &mut R,
    ) -> TuneResult<()>;

    /// Advance the engine by one generation.
    ///
    /// Returns `true` once the phase is finished.
    fn perform_iteration<S, R>(&mut self, sorter: &mut S, rng: &mut R) -> TuneResult<bool>
    where
        S: SearchPointSorter<Self::Point>,
        R: Rng;

    /// Generations completed in the current phase
    fn current_generation(&self) -> usize;

    /// Best point found so far in the current phase
    fn best_point(&self) -> Option<&Self::Point>;

    /// End the phase and return the updated population
    fn finish_phase(&mut self) -> TuneResult<Population>;

    /// Write the phase state to a status file
    fn dump_status(&self, path: &Path, format: StatusFormat) -> TuneResult<()>;

    /// Continue a phase from a status file
    fn use_status_dump(&mut self, path: &Path) -> TuneResult<()>;

    /// Iterate until the phase is finished, then finish it
    fn run_phase<S, R>(&mut self, sorter: &mut S, rng: &mut R) -> TuneResult<Population>
    where
        S: SearchPointSorter<Self::Point>,
        R: Rng,
    {
        while !self.perform_iteration(sorter, rng)? {}
        self.finish_phase()
    }
}

pub mod prelude {
    pub use super::information_flow::*;
    pub use super::{
        CmaEsStrategy, ContinuousOptimizationStrategy, DifferentialEvolutionStrategy,
        PhaseContext, Population, StrategyConfiguration,
    };
}
