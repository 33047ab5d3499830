//! Differential Evolution (JADE)
//!
//! Adaptive differential evolution with current-to-pbest/1 mutation,
//! binomial crossover and an external archive of replaced parents. The
//! mutation factor is drawn from a Cauchy and the crossover rate from a
//! normal distribution around means that follow the successful values.
//!
//! Every point keeps a link to its parent, so factories that only cover part
//! of a genome (see [`PartialSearchSpace`](crate::search_point::partial::PartialSearchSpace))
//! can carry the remaining genes forward.
//!
//! Reference: Zhang, J., Sanderson, A. C. (2009). JADE: Adaptive
//! Differential Evolution With Optional External Archive.

pub mod configuration;

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Cauchy, Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use configuration::{DifferentialEvolutionConfiguration, MINIMUM_POPULATION_SIZE};

use crate::checkpoint::{read_status, write_status, StatusFormat};
use crate::error::{CheckpointError, OptimizationError, TuneResult};
use crate::search_point::{SearchPoint, SearchPointFactory};
use crate::sorting::{validate_ranking, SearchPointSorter};

const COMPONENT: &str = "differential_evolution";

/// Scale of the Cauchy and normal distributions around the means
const PARAMETER_SPREAD: f64 = 0.1;

/// Serializable state of a JADE run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifferentialEvolutionState<P> {
    /// Static configuration
    pub configuration: DifferentialEvolutionConfiguration,
    /// Completed generations
    pub generation: usize,
    /// Current mean of the mutation factor
    pub mean_mutation_factor: f64,
    /// Current mean of the crossover rate
    pub mean_crossover_rate: f64,
    /// Current population; best first once `is_ranked`
    pub population: Vec<P>,
    /// Whether `population` is ordered best first
    pub is_ranked: bool,
    /// Values of parents that lost against their trial
    pub archive: Vec<Vec<f64>>,
}

/// Trial produced for one population member
struct Trial<P> {
    point: P,
    mutation_factor: f64,
    crossover_rate: f64,
}

/// JADE optimizer
pub struct DifferentialEvolution<F: SearchPointFactory> {
    factory: F,
    state: Option<DifferentialEvolutionState<F::Point>>,
}

impl<F: SearchPointFactory> DifferentialEvolution<F> {
    /// Create an uninitialized optimizer
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: None,
        }
    }

    /// Start a new run on the given initial points
    pub fn initialize(
        &mut self,
        configuration: DifferentialEvolutionConfiguration,
        initial_points: Vec<F::Point>,
    ) -> TuneResult<()> {
        configuration.validate()?;
        if initial_points.len() < MINIMUM_POPULATION_SIZE {
            return Err(OptimizationError::Configuration(format!(
                "population size must be at least {}, got {}",
                MINIMUM_POPULATION_SIZE,
                initial_points.len()
            ))
            .into());
        }
        let dimension = self.factory.dimension();
        if dimension == 0 {
            return Err(OptimizationError::Configuration(
                "search space has no continuizable dimension".to_string(),
            )
            .into());
        }
        if let Some(point) = initial_points.iter().find(|p| p.values().len() != dimension) {
            return Err(OptimizationError::Configuration(format!(
                "initial point has dimension {}, search space has {}",
                point.values().len(),
                dimension
            ))
            .into());
        }

        info!(
            dimension,
            population_size = initial_points.len(),
            best_percentage = configuration.best_percentage,
            "initializing differential evolution"
        );
        self.state = Some(DifferentialEvolutionState {
            generation: 0,
            mean_mutation_factor: configuration.initial_mean_mutation_factor,
            mean_crossover_rate: configuration.initial_mean_crossover_rate,
            configuration,
            population: initial_points,
            is_ranked: false,
            archive: Vec::new(),
        });
        Ok(())
    }

    /// Whether a run has been started or restored
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// The point factory
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Current run state
    pub fn state(&self) -> Option<&DifferentialEvolutionState<F::Point>> {
        self.state.as_ref()
    }

    /// Completed generations
    pub fn generation(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.generation)
    }

    /// Current population, best first after the first generation
    pub fn population(&self) -> &[F::Point] {
        self.state
            .as_ref()
            .map(|s| s.population.as_slice())
            .unwrap_or(&[])
    }

    /// Best point of the last ranking
    pub fn best_point(&self) -> Option<&F::Point> {
        self.state
            .as_ref()
            .filter(|s| s.is_ranked)
            .and_then(|s| s.population.first())
    }

    /// Evolve the population by one generation
    pub fn next_generation<S, R>(&mut self, sorter: &mut S, rng: &mut R) -> TuneResult<()>
    where
        S: SearchPointSorter<F::Point>,
        R: Rng,
    {
        let state = self.state.as_mut().ok_or(OptimizationError::NotInitialized)?;

        if !state.is_ranked {
            let ranking = rank(sorter, &state.population)?;
            state.population = reorder(std::mem::take(&mut state.population), &ranking);
            state.is_ranked = true;
        }

        let trials = create_trials(&self.factory, state, rng)?;
        let population_size = state.population.len();

        // Parents and trials compete in one ranking
        let mut candidates = state.population.clone();
        candidates.extend(trials.iter().map(|t| t.point.clone()));
        let ranking = rank(sorter, &candidates)?;
        let mut position = vec![0; candidates.len()];
        for (place, &index) in ranking.iter().enumerate() {
            position[index] = place;
        }

        let mut successful_factors = Vec::new();
        let mut successful_rates = Vec::new();
        let mut survivors = Vec::with_capacity(population_size);
        for (i, trial) in trials.into_iter().enumerate() {
            let trial_index = population_size + i;
            if position[trial_index] < position[i] {
                successful_factors.push(trial.mutation_factor);
                successful_rates.push(trial.crossover_rate);
                state.archive.push(candidates[i].values().to_vec());
                survivors.push((position[trial_index], trial.point));
            } else {
                survivors.push((position[i], candidates[i].clone()));
            }
        }
        survivors.sort_by_key(|(place, _)| *place);
        state.population = survivors.into_iter().map(|(_, point)| point).collect();

        while state.archive.len() > population_size {
            let index = rng.gen_range(0..state.archive.len());
            state.archive.swap_remove(index);
        }

        let learning_rate = state.configuration.learning_rate;
        if !successful_factors.is_empty() {
            state.mean_crossover_rate = (1.0 - learning_rate) * state.mean_crossover_rate
                + learning_rate * arithmetic_mean(&successful_rates);
            state.mean_mutation_factor = (1.0 - learning_rate) * state.mean_mutation_factor
                + learning_rate * lehmer_mean(&successful_factors);
        }
        state.generation += 1;

        debug!(
            generation = state.generation,
            successful = successful_factors.len(),
            mean_mutation_factor = state.mean_mutation_factor,
            mean_crossover_rate = state.mean_crossover_rate,
            archive = state.archive.len(),
            repaired = state.population.iter().filter(|p| p.is_repaired()).count(),
            "differential evolution generation finished"
        );
        Ok(())
    }

    /// Write the run state to a status file
    pub fn dump_status(&self, path: impl AsRef<Path>, format: StatusFormat) -> TuneResult<()> {
        let state = self.state.as_ref().ok_or(OptimizationError::NotInitialized)?;
        write_status(path, COMPONENT, state, format)?;
        Ok(())
    }

    /// Continue a run from a status file written by
    /// [`dump_status`](Self::dump_status)
    pub fn use_status_dump(&mut self, path: impl AsRef<Path>) -> TuneResult<()> {
        let state: DifferentialEvolutionState<F::Point> = read_status(path, COMPONENT)?;
        self.restore(state)
    }

    /// Continue a run from a snapshot of its [`state`](Self::state)
    ///
    /// Population and archive entries must match the factory's dimension and
    /// both parameter means must be finite.
    pub fn restore(&mut self, state: DifferentialEvolutionState<F::Point>) -> TuneResult<()> {
        state.configuration.validate()?;
        let dimension = self.factory.dimension();
        if state.population.len() < MINIMUM_POPULATION_SIZE
            || state.population.iter().any(|p| p.values().len() != dimension)
        {
            return Err(CheckpointError::Incompatible(format!(
                "state holds {} points that do not fit a {}-dimensional space",
                state.population.len(),
                dimension
            ))
            .into());
        }
        if let Some(entry) = state.archive.iter().find(|a| a.len() != dimension) {
            return Err(CheckpointError::Incompatible(format!(
                "archive holds an entry of dimension {}, search space has {}",
                entry.len(),
                dimension
            ))
            .into());
        }
        if !state.mean_mutation_factor.is_finite() || !state.mean_crossover_rate.is_finite() {
            return Err(CheckpointError::Incompatible(format!(
                "parameter means must be finite, got {} and {}",
                state.mean_mutation_factor, state.mean_crossover_rate
            ))
            .into());
        }
        info!(generation = state.generation, "resuming differential evolution");
        self.state = Some(state);
        Ok(())
    }
}

fn rank<P, S>(sorter: &mut S, points: &[P]) -> TuneResult<Vec<usize>>
where
    P: SearchPoint,
    S: SearchPointSorter<P>,
{
    let ranking = sorter.sort(points)?;
    if let Err(e) = validate_ranking(&ranking, points.len()) {
        warn!(error = %e, "sorter returned an invalid ranking");
        return Err(e.into());
    }
    Ok(ranking)
}

fn reorder<P>(points: Vec<P>, ranking: &[usize]) -> Vec<P> {
    let mut slots: Vec<Option<P>> = points.into_iter().map(Some).collect();
    ranking.iter().filter_map(|&i| slots[i].take()).collect()
}

/// Build one trial per population member
fn create_trials<F, R>(
    factory: &F,
    state: &DifferentialEvolutionState<F::Point>,
    rng: &mut R,
) -> TuneResult<Vec<Trial<F::Point>>>
where
    F: SearchPointFactory,
    R: Rng,
{
    let population = &state.population;
    let population_size = population.len();
    let best_count = state.configuration.best_count(population_size);

    let factor_distribution = Cauchy::new(state.mean_mutation_factor, PARAMETER_SPREAD)
        .map_err(|e| OptimizationError::Configuration(e.to_string()))?;
    let rate_distribution = Normal::new(state.mean_crossover_rate, PARAMETER_SPREAD)
        .map_err(|e| OptimizationError::Configuration(e.to_string()))?;

    let mut trials = Vec::with_capacity(population_size);
    for (i, parent) in population.iter().enumerate() {
        let mutation_factor = loop {
            let factor: f64 = factor_distribution.sample(rng);
            if factor > 0.0 {
                break factor.min(1.0);
            }
        };
        let crossover_rate = rate_distribution.sample(rng).clamp(0.0, 1.0);

        let current = parent.values();
        let best = population[rng.gen_range(0..best_count)].values();
        let r1 = draw_index(rng, population_size, &[i]);
        let r2 = draw_index(rng, population_size + state.archive.len(), &[i, r1]);
        let first = population[r1].values();
        let second = if r2 < population_size {
            population[r2].values()
        } else {
            state.archive[r2 - population_size].as_slice()
        };

        let forced = rng.gen_range(0..current.len());
        let values = (0..current.len())
            .map(|j| {
                if j == forced || rng.gen::<f64>() < crossover_rate {
                    current[j]
                        + mutation_factor * (best[j] - current[j])
                        + mutation_factor * (first[j] - second[j])
                } else {
                    current[j]
                }
            })
            .collect();

        trials.push(Trial {
            point: factory.create(values, Some(parent))?,
            mutation_factor,
            crossover_rate,
        });
    }
    Ok(trials)
}

/// Uniform index in `0..len` that is not in `excluded`
fn draw_index<R: Rng>(rng: &mut R, len: usize, excluded: &[usize]) -> usize {
    let candidates: Vec<usize> = (0..len).filter(|i| !excluded.contains(i)).collect();
    // Populations have at least three members, so a candidate always exists
    candidates.choose(rng).copied().unwrap_or(0)
}

fn arithmetic_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// `sum(F²) / sum(F)`, biased towards larger factors
fn lehmer_mean(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>() / values.iter().sum::<f64>()
}

pub mod prelude {
    pub use super::configuration::*;
    pub use super::{DifferentialEvolution, DifferentialEvolutionState};
}
