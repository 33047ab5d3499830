//! Differential evolution refinement of the continuizable parameters

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    ContinuousOptimizationStrategy, PhaseContext, Population, StrategyConfiguration,
};
use crate::algorithms::differential_evolution::{
    DifferentialEvolution, DifferentialEvolutionConfiguration, DifferentialEvolutionState,
    MINIMUM_POPULATION_SIZE,
};
use crate::checkpoint::{read_status, write_status, StatusFormat};
use crate::error::{OptimizationError, TuneResult};
use crate::genome::builder::GenomeBuilder;
use crate::genome::genome::Genome;
use crate::parameters::tree::ParameterTree;
use crate::search_point::partial::{PartialGenomeSearchPoint, PartialSearchSpace};
use crate::sorting::SearchPointSorter;

const COMPONENT: &str = "differential_evolution_strategy";

/// Status file content of a [`DifferentialEvolutionStrategy`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DifferentialEvolutionStrategyStatus {
    /// Population and incumbent the phase started from
    pub context: PhaseContext,
    /// Engine state
    pub engine: DifferentialEvolutionState<PartialGenomeSearchPoint>,
}

/// Refinement phase running JADE over the continuizable parameters
///
/// Categorical parameters and integer parameters with fewer than
/// `minimum_domain_size` values keep the values of the genome each point is
/// linked to.
pub struct DifferentialEvolutionStrategy {
    configuration: StrategyConfiguration,
    engine_configuration: DifferentialEvolutionConfiguration,
    engine: DifferentialEvolution<PartialSearchSpace>,
    context: Option<PhaseContext>,
}

impl DifferentialEvolutionStrategy {
    /// Create a strategy for a parameter tree
    pub fn new(
        tree: Arc<ParameterTree>,
        builder: Arc<dyn GenomeBuilder>,
        configuration: StrategyConfiguration,
        engine_configuration: DifferentialEvolutionConfiguration,
    ) -> TuneResult<Self> {
        configuration.validate()?;
        engine_configuration.validate()?;
        let space = PartialSearchSpace::new(&tree, builder, configuration.minimum_domain_size);
        Ok(Self {
            configuration,
            engine_configuration,
            engine: DifferentialEvolution::new(space),
            context: None,
        })
    }

    /// Strategy configuration
    pub fn configuration(&self) -> &StrategyConfiguration {
        &self.configuration
    }

    /// The JADE engine
    pub fn engine(&self) -> &DifferentialEvolution<PartialSearchSpace> {
        &self.engine
    }
}

impl ContinuousOptimizationStrategy for DifferentialEvolutionStrategy {
    type Point = PartialGenomeSearchPoint;

    fn initialize<R: Rng>(
        &mut self,
        population: Population,
        incumbent: Option<Genome>,
        rng: &mut R,
    ) -> TuneResult<()> {
        let flow = self.configuration.information_flow();
        let population_size = self.configuration.population_size.unwrap_or_else(|| {
            population
                .competitive()
                .len()
                .max(MINIMUM_POPULATION_SIZE)
        });
        let points = flow.determine_initial_points(
            self.engine.factory(),
            &population,
            incumbent.as_ref(),
            population_size,
            rng,
        )?;

        info!(
            flow = ?flow,
            competitive = population.competitive().len(),
            population_size,
            "starting differential evolution phase"
        );
        self.engine
            .initialize(self.engine_configuration.clone(), points)?;
        self.context = Some(PhaseContext {
            population,
            incumbent,
        });
        Ok(())
    }

    fn perform_iteration<S, R>(&mut self, sorter: &mut S, rng: &mut R) -> TuneResult<bool>
    where
        S: SearchPointSorter<Self::Point>,
        R: Rng,
    {
        if self.context.is_none() {
            return Err(OptimizationError::NotInitialized.into());
        }
        self.engine.next_generation(sorter, rng)?;
        Ok(self.engine.generation() >= self.configuration.maximum_number_generations)
    }

    fn current_generation(&self) -> usize {
        self.engine.generation()
    }

    fn best_point(&self) -> Option<&Self::Point> {
        self.engine.best_point()
    }

    fn finish_phase(&mut self) -> TuneResult<Population> {
        let context = self.context.take().ok_or(OptimizationError::NotInitialized)?;
        let sorted: &[PartialGenomeSearchPoint] = if self.engine.best_point().is_some() {
            self.engine.population()
        } else {
            &[]
        };
        let competitive = match self.configuration.information_flow().define_competitive_population(
            context.population.competitive(),
            context.incumbent.as_ref(),
            sorted,
            self.configuration.replacement_rate,
        ) {
            Ok(competitive) => competitive,
            Err(e) => {
                self.context = Some(context);
                return Err(e);
            }
        };

        info!(
            generations = self.engine.generation(),
            "finished differential evolution phase"
        );
        Ok(context.population.with_competitive(competitive))
    }

    fn dump_status(&self, path: &Path, format: StatusFormat) -> TuneResult<()> {
        let context = self.context.clone().ok_or(OptimizationError::NotInitialized)?;
        let engine = self
            .engine
            .state()
            .cloned()
            .ok_or(OptimizationError::NotInitialized)?;
        write_status(path, COMPONENT, &DifferentialEvolutionStrategyStatus { context, engine }, format)?;
        Ok(())
    }

    fn use_status_dump(&mut self, path: &Path) -> TuneResult<()> {
        let status: DifferentialEvolutionStrategyStatus = read_status(path, COMPONENT)?;
        self.engine.restore(status.engine)?;
        self.context = Some(status.context);
        Ok(())
    }
}
