//! Genome type
//!
//! A genome is a complete assignment of parameter identifiers to alleles,
//! together with the age the outer genetic algorithm tracks.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::parameters::allele::Allele;
use crate::parameters::tree::ParameterTree;

/// Mapping from parameter identifier to allele, plus an age
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    genes: BTreeMap<String, Allele>,
    age: u32,
}

impl Genome {
    /// Create an empty genome of the given age
    pub fn new(age: u32) -> Self {
        Self {
            genes: BTreeMap::new(),
            age,
        }
    }

    /// Create a genome from identifier/value pairs
    pub fn from_genes<I, K>(genes: I, age: u32) -> Self
    where
        I: IntoIterator<Item = (K, Allele)>,
        K: Into<String>,
    {
        Self {
            genes: genes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            age,
        }
    }

    /// Age in generations
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Set the age
    pub fn set_age(&mut self, age: u32) {
        self.age = age;
    }

    /// Set a gene, replacing any previous value
    pub fn set_gene(&mut self, identifier: impl Into<String>, value: Allele) {
        self.genes.insert(identifier.into(), value);
    }

    /// Value of a gene
    pub fn gene_value(&self, identifier: &str) -> Option<&Allele> {
        self.genes.get(identifier)
    }

    /// All genes in identifier order
    pub fn genes(&self) -> impl Iterator<Item = (&str, &Allele)> {
        self.genes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of genes
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether the genome holds no genes
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Only the genes that are active according to the tree's OR nodes
    pub fn filtered_genes(&self, tree: &ParameterTree) -> BTreeMap<String, Allele> {
        tree.active_identifiers(self)
            .into_iter()
            .filter_map(|id| self.genes.get(id).map(|v| (id.to_string(), v.clone())))
            .collect()
    }

    /// Gene-value equality, ignoring age
    pub fn is_equal_by_gene_values(&self, other: &Genome) -> bool {
        self.genes == other.genes
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (id, value)) in self.genes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", id, value)?;
        }
        write!(f, "](Age: {})", self.age)
    }
}

/// Shared, immutable genome
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImmutableGenome(Arc<Genome>);

impl ImmutableGenome {
    /// Freeze a genome
    pub fn new(genome: Genome) -> Self {
        Self(Arc::new(genome))
    }

    /// Copy out a mutable genome
    pub fn create_mutable_genome(&self) -> Genome {
        self.0.as_ref().clone()
    }
}

impl Deref for ImmutableGenome {
    type Target = Genome;

    fn deref(&self) -> &Genome {
        &self.0
    }
}

impl From<Genome> for ImmutableGenome {
    fn from(genome: Genome) -> Self {
        Self::new(genome)
    }
}
