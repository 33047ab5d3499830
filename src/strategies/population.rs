//! Genetic population handed to a refinement phase

use serde::{Deserialize, Serialize};

use crate::genome::genome::Genome;

/// Population of the outer genetic algorithm
///
/// Only the competitive part takes part in tournaments and is refined by the
/// continuous optimizers; the non-competitive part is passed through.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Population {
    competitive: Vec<Genome>,
    non_competitive: Vec<Genome>,
}

impl Population {
    /// Create a population from its two parts
    pub fn new(competitive: Vec<Genome>, non_competitive: Vec<Genome>) -> Self {
        Self {
            competitive,
            non_competitive,
        }
    }

    /// Genomes taking part in tournaments
    pub fn competitive(&self) -> &[Genome] {
        &self.competitive
    }

    /// Genomes kept for diversity only
    pub fn non_competitive(&self) -> &[Genome] {
        &self.non_competitive
    }

    /// Same population with a new competitive part
    pub fn with_competitive(self, competitive: Vec<Genome>) -> Self {
        Self {
            competitive,
            non_competitive: self.non_competitive,
        }
    }

    /// Whether a genome with the same gene values is competitive
    pub fn is_competitive(&self, genome: &Genome) -> bool {
        self.competitive
            .iter()
            .any(|g| g.is_equal_by_gene_values(genome))
    }

    /// Total number of genomes
    pub fn len(&self) -> usize {
        self.competitive.len() + self.non_competitive.len()
    }

    /// Whether the population holds no genome
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
