//! Fixed-length real-valued genome representation
//!
//! Used as the feature vector of the tree-based performance predictor.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::GenomeError;
use crate::genome::genome::Genome;
use crate::parameters::domain::Domain;
use crate::parameters::tree::ParameterTree;

/// Ordered array of doubles with value-based equality and hashing
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenomeDoubleRepresentation(Vec<f64>);

impl GenomeDoubleRepresentation {
    /// Wrap a vector
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Convert a genome with one feature per tree parameter in identifier
    /// order. Categorical values become their index in the domain.
    pub fn from_genome(genome: &Genome, tree: &ParameterTree) -> Result<Self, GenomeError> {
        tree.parameters()
            .map(|(id, domain)| {
                let value = genome
                    .gene_value(id)
                    .ok_or_else(|| GenomeError::MissingGene(id.to_string()))?;
                let converted = match domain {
                    Domain::Categorical { .. } => domain.category_index(value).map(|i| i as f64),
                    _ => value.as_f64(),
                };
                converted.ok_or_else(|| GenomeError::ValueOutsideDomain {
                    identifier: id.to_string(),
                    value: value.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Borrow the values
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Take the values
    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for GenomeDoubleRepresentation {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }
}

// NaN entries make a representation unequal to itself; converted genomes never contain NaN.
impl Eq for GenomeDoubleRepresentation {}

impl Hash for GenomeDoubleRepresentation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for value in &self.0 {
            // -0.0 == 0.0, so both must hash alike
            (value + 0.0).to_bits().hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::allele::Allele;
    use crate::parameters::tree::ParameterNode;
    use std::collections::HashSet;

    #[test]
    fn test_value_based_equality_and_hash() {
        let a = GenomeDoubleRepresentation::from_vec(vec![0.0, 1.5]);
        let b = GenomeDoubleRepresentation::from_vec(vec![-0.0, 1.5]);
        let c = GenomeDoubleRepresentation::from_vec(vec![0.0, 1.5, 2.0]);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_from_genome_uses_sorted_identifiers() {
        let tree = ParameterTree::new(ParameterNode::and(vec![
            ParameterNode::value("z", Domain::integer(0, 9).unwrap()),
            ParameterNode::value("a", Domain::categorical(["p", "q", "r"]).unwrap()),
        ]))
        .unwrap();
        let genome = Genome::from_genes([("z", Allele::Int(7)), ("a", Allele::from("r"))], 0);

        let converted = GenomeDoubleRepresentation::from_genome(&genome, &tree).unwrap();
        assert_eq!(converted.as_slice(), &[2.0, 7.0]);
    }

    #[test]
    fn test_from_genome_missing_gene() {
        let tree = ParameterTree::new(ParameterNode::value(
            "x",
            Domain::continuous(0.0, 1.0).unwrap(),
        ))
        .unwrap();
        let result = GenomeDoubleRepresentation::from_genome(&Genome::new(0), &tree);
        assert_eq!(result, Err(GenomeError::MissingGene("x".to_string())));
    }
}
