//! CMA-ES refinement of the whole genome

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    ContinuousOptimizationStrategy, PhaseContext, Population, StrategyConfiguration,
};
use crate::algorithms::cmaes::{CmaEs, CmaEsConfiguration, CmaEsStatus};
use crate::checkpoint::{read_status, write_status, StatusFormat};
use crate::error::{OptimizationError, TuneResult};
use crate::genome::builder::GenomeBuilder;
use crate::genome::genome::Genome;
use crate::parameters::tree::ParameterTree;
use crate::search_point::continuized::{ContinuizedGenomeSearchPoint, ContinuizedSearchSpace};
use crate::search_point::{SearchPoint, SearchPointFactory};
use crate::sorting::SearchPointSorter;
use crate::termination::default_termination_criteria;

const COMPONENT: &str = "cmaes_strategy";

/// Status file content of a [`CmaEsStrategy`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CmaEsStrategyStatus {
    /// Population and incumbent the phase started from
    pub context: PhaseContext,
    /// Engine state
    pub engine: CmaEsStatus<ContinuizedGenomeSearchPoint>,
}

/// Refinement phase running CMA-ES over all parameters
///
/// The competitive population is rebuilt from the ranking of the last
/// generation only. With the local flow the incumbent is handed back as the
/// best point of that generation, even if the incumbent itself was better.
pub struct CmaEsStrategy {
    configuration: StrategyConfiguration,
    engine: CmaEs<ContinuizedSearchSpace>,
    context: Option<PhaseContext>,
}

impl CmaEsStrategy {
    /// Create a strategy for a parameter tree
    pub fn new(
        tree: Arc<ParameterTree>,
        builder: Arc<dyn GenomeBuilder>,
        configuration: StrategyConfiguration,
    ) -> TuneResult<Self> {
        configuration.validate()?;
        Ok(Self {
            configuration,
            engine: CmaEs::new(ContinuizedSearchSpace::new(tree, builder)),
            context: None,
        })
    }

    /// Strategy configuration
    pub fn configuration(&self) -> &StrategyConfiguration {
        &self.configuration
    }

    /// The CMA-ES engine
    pub fn engine(&self) -> &CmaEs<ContinuizedSearchSpace> {
        &self.engine
    }

    /// Initial step size: fixed, or the mean standard deviation of the
    /// competitive population per standardized dimension
    fn initial_step_size(&self, competitive: &[Genome]) -> TuneResult<f64> {
        let fixed = self.configuration.initial_step_size;
        if self.configuration.fix_initial_step_size || competitive.len() < 2 {
            return Ok(fixed);
        }

        let factory = self.engine.factory();
        let points = competitive
            .iter()
            .map(|genome| factory.create_from_genome(genome))
            .collect::<TuneResult<Vec<_>>>()?;
        let dimension = factory.dimension();
        let count = points.len() as f64;

        let mut total = 0.0;
        for d in 0..dimension {
            let mean = points.iter().map(|p| p.values()[d]).sum::<f64>() / count;
            let variance = points
                .iter()
                .map(|p| (p.values()[d] - mean).powi(2))
                .sum::<f64>()
                / count;
            total += variance.sqrt();
        }
        let step_size = total / dimension as f64;
        Ok(if step_size > 0.0 && step_size.is_finite() {
            step_size
        } else {
            fixed
        })
    }
}

impl ContinuousOptimizationStrategy for CmaEsStrategy {
    type Point = ContinuizedGenomeSearchPoint;

    fn initialize<R: Rng>(
        &mut self,
        population: Population,
        incumbent: Option<Genome>,
        _rng: &mut R,
    ) -> TuneResult<()> {
        let flow = self.configuration.information_flow();
        let mean = flow.determine_initial_mean(
            self.engine.factory(),
            &population,
            incumbent.as_ref(),
        )?;
        let population_size = self
            .configuration
            .population_size
            .unwrap_or_else(|| CmaEsConfiguration::default_population_size(mean.len()));
        let step_size = self.initial_step_size(population.competitive())?;

        info!(
            flow = ?flow,
            competitive = population.competitive().len(),
            step_size,
            "starting CMA-ES phase"
        );
        let configuration = CmaEsConfiguration::new(population_size, mean, step_size)?;
        self.engine.initialize(
            configuration,
            default_termination_criteria(self.configuration.maximum_number_generations)?,
        )?;
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
        self.engine.next_generation(sorter, rng)
    }

    fn current_generation(&self) -> usize {
        self.engine.generation()
    }

    fn best_point(&self) -> Option<&Self::Point> {
        self.engine.best_point()
    }

    fn finish_phase(&mut self) -> TuneResult<Population> {
        let context = self.context.take().ok_or(OptimizationError::NotInitialized)?;
        let competitive = match self.configuration.information_flow().define_competitive_population(
            context.population.competitive(),
            context.incumbent.as_ref(),
            self.engine.sorted_population(),
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
            reason = self.engine.termination_reason()?.unwrap_or("phase ended early"),
            "finished CMA-ES phase"
        );
        Ok(context.population.with_competitive(competitive))
    }

    fn dump_status(&self, path: &Path, format: StatusFormat) -> TuneResult<()> {
        let context = self.context.clone().ok_or(OptimizationError::NotInitialized)?;
        let status = CmaEsStrategyStatus {
            context,
            engine: self.engine.status(),
        };
        write_status(path, COMPONENT, &status, format)?;
        Ok(())
    }

    fn use_status_dump(&mut self, path: &Path) -> TuneResult<()> {
        let status: CmaEsStrategyStatus = read_status(path, COMPONENT)?;
        self.engine.restore(
            status.engine,
            default_termination_criteria(self.configuration.maximum_number_generations)?,
        )?;
        self.context = Some(status.context);
        Ok(())
    }
}
