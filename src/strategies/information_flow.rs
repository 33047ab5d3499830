//! How a refinement phase exchanges genomes with the genetic population
//!
//! The local flow concentrates the search around the incumbent and only
//! ever writes back into the incumbent's slot. The global flow spreads the
//! search over the competitive population and replaces part of it.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::population::Population;
use crate::error::{OptimizationError, TuneResult};
use crate::genome::genome::Genome;
use crate::search_point::{SearchPoint, SearchPointFactory};

/// Information flow between genetic population and continuous optimizer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InformationFlow {
    /// Spread over the competitive population
    #[default]
    Global,
    /// Focus on the incumbent
    Local,
}

impl InformationFlow {
    /// Points of the first generation, exactly `population_size` of them.
    ///
    /// Local: the incumbent's point first, then points taking their values
    /// from randomly drawn competitive genomes while linked to the
    /// incumbent. Global: the incumbent (if any) and randomly drawn
    /// competitive genomes, each linked to itself.
    pub fn determine_initial_points<F, R>(
        &self,
        factory: &F,
        population: &Population,
        incumbent: Option<&Genome>,
        population_size: usize,
        rng: &mut R,
    ) -> TuneResult<Vec<F::Point>>
    where
        F: SearchPointFactory,
        R: Rng,
    {
        if population_size == 0 {
            return Err(OptimizationError::Configuration(
                "population size must be positive".to_string(),
            )
            .into());
        }

        match self {
            Self::Local => {
                let incumbent = require_incumbent(incumbent)?;
                let incumbent_point = factory.create_from_genome(incumbent)?;
                let pool: Vec<&Genome> = population.competitive().iter().collect();
                let donors = draw(&pool, population_size - 1, rng);
                if donors.len() < population_size - 1 {
                    return Err(empty_competitive_population());
                }

                let mut points = Vec::with_capacity(population_size);
                for donor in donors {
                    let values = factory.create_from_genome(donor)?.values().to_vec();
                    points.push(factory.create(values, Some(&incumbent_point))?);
                }
                points.insert(0, incumbent_point);
                Ok(points)
            }
            Self::Global => {
                let mut genomes: Vec<&Genome> = incumbent.into_iter().collect();
                let others: Vec<&Genome> = population
                    .competitive()
                    .iter()
                    .filter(|g| !incumbent.is_some_and(|i| g.is_equal_by_gene_values(i)))
                    .collect();
                let missing = population_size.saturating_sub(genomes.len());
                genomes.extend(draw(&others, missing, rng));
                if genomes.len() < population_size {
                    return Err(empty_competitive_population());
                }
                genomes.truncate(population_size);

                genomes
                    .into_iter()
                    .map(|genome| factory.create_from_genome(genome))
                    .collect()
            }
        }
    }

    /// Start of the CMA-ES distribution: the incumbent's point (local) or the
    /// mean point of the competitive population (global)
    pub fn determine_initial_mean<F: SearchPointFactory>(
        &self,
        factory: &F,
        population: &Population,
        incumbent: Option<&Genome>,
    ) -> TuneResult<Vec<f64>> {
        match self {
            Self::Local => {
                let incumbent = require_incumbent(incumbent)?;
                Ok(factory.create_from_genome(incumbent)?.values().to_vec())
            }
            Self::Global => {
                let competitive = population.competitive();
                if competitive.is_empty() {
                    return Err(empty_competitive_population());
                }
                let mut mean = vec![0.0; factory.dimension()];
                for genome in competitive {
                    let point = factory.create_from_genome(genome)?;
                    for (sum, value) in mean.iter_mut().zip(point.values()) {
                        *sum += value;
                    }
                }
                let count = competitive.len() as f64;
                Ok(mean.into_iter().map(|sum| sum / count).collect())
            }
        }
    }

    /// Competitive population after a phase, of unchanged size.
    ///
    /// Local: the incumbent is replaced by the best point's genome. The
    /// incumbent is not compared against that point, so when `sorted_points`
    /// only holds the last generation (CMA-ES) a final generation worse than
    /// the incumbent still replaces it. Global:
    /// the top `ceil(replacement_rate * |competitive|)` distinct new point
    /// genomes replace the original non-incumbent genomes whose points ranked
    /// worst, genomes without a point first. Replacements inherit the age of
    /// the genome they replace.
    pub fn define_competitive_population<P: SearchPoint>(
        &self,
        original: &[Genome],
        incumbent: Option<&Genome>,
        sorted_points: &[P],
        replacement_rate: f64,
    ) -> TuneResult<Vec<Genome>> {
        let Some(best) = sorted_points.first() else {
            return Err(OptimizationError::InvalidPopulation(
                "no ranked points to take genomes from".to_string(),
            )
            .into());
        };
        let mut competitive = original.to_vec();

        match self {
            Self::Local => {
                let incumbent = require_incumbent(incumbent)?;
                match original
                    .iter()
                    .position(|g| g.is_equal_by_gene_values(incumbent))
                {
                    Some(index) => competitive[index] = inherit_age(best.genome(), &original[index]),
                    None => debug!("incumbent is not part of the competitive population"),
                }
            }
            Self::Global => {
                let count = (replacement_rate * original.len() as f64).ceil() as usize;
                let mut replacements: Vec<&Genome> = Vec::with_capacity(count);
                for point in sorted_points {
                    if replacements.len() == count {
                        break;
                    }
                    let genome = point.genome();
                    let is_new = !original.iter().any(|g| g.is_equal_by_gene_values(genome))
                        && !replacements.iter().any(|g| g.is_equal_by_gene_values(genome));
                    if is_new {
                        replacements.push(genome);
                    }
                }

                // Original genomes ordered worst first by the rank of their point
                let mut replaceable: Vec<(usize, usize)> = original
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| !incumbent.is_some_and(|i| g.is_equal_by_gene_values(i)))
                    .map(|(index, g)| {
                        let rank = sorted_points
                            .iter()
                            .position(|p| p.genome().is_equal_by_gene_values(g))
                            .unwrap_or(usize::MAX);
                        (index, rank)
                    })
                    .collect();
                replaceable.sort_by(|a, b| b.1.cmp(&a.1));

                for ((index, _), replacement) in replaceable.iter().zip(replacements) {
                    competitive[*index] = inherit_age(replacement, &original[*index]);
                }
            }
        }
        Ok(competitive)
    }
}

fn require_incumbent(incumbent: Option<&Genome>) -> TuneResult<&Genome> {
    incumbent.ok_or_else(|| {
        OptimizationError::InvalidPopulation(
            "local information flow needs an incumbent".to_string(),
        )
        .into()
    })
}

fn empty_competitive_population() -> crate::error::TuneError {
    OptimizationError::InvalidPopulation(
        "competitive population has too few genomes".to_string(),
    )
    .into()
}

fn inherit_age(genome: &Genome, replaced: &Genome) -> Genome {
    let mut genome = genome.clone();
    genome.set_age(replaced.age());
    genome
}

/// Draw `count` items, without replacement while the pool allows it
fn draw<'a, R: Rng>(pool: &[&'a Genome], count: usize, rng: &mut R) -> Vec<&'a Genome> {
    let mut drawn = Vec::with_capacity(count);
    if pool.is_empty() {
        return drawn;
    }
    while drawn.len() < count {
        let needed = (count - drawn.len()).min(pool.len());
        drawn.extend(pool.choose_multiple(rng, needed).copied());
    }
    drawn
}
