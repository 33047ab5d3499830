//! Partially continuized genome search space
//!
//! Only numeric parameters with enough distinct values are handled by the
//! continuous optimizer. Categorical parameters and small integer ranges are
//! copied unchanged from an underlying genome each point is linked to.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GenomeError, SearchPointError, TuneResult};
use crate::genome::builder::GenomeBuilder;
use crate::genome::genome::Genome;
use crate::parameters::domain::Domain;
use crate::parameters::tree::ParameterTree;
use crate::search_point::bounded::{BoundedSearchPoint, DimensionScaling};
use crate::search_point::continuized::scaling_for;
use crate::search_point::{SearchPoint, SearchPointFactory};

/// Search point covering the continuizable part of a genome
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialGenomeSearchPoint {
    point: BoundedSearchPoint,
    genome: Genome,
    underlying_genome: Genome,
    is_repaired: bool,
}

impl SearchPoint for PartialGenomeSearchPoint {
    fn bounded_point(&self) -> &BoundedSearchPoint {
        &self.point
    }

    fn genome(&self) -> &Genome {
        &self.genome
    }

    fn is_repaired(&self) -> bool {
        self.is_repaired
    }

    fn underlying_genome(&self) -> Option<&Genome> {
        Some(&self.underlying_genome)
    }
}

#[derive(Clone, Debug)]
struct ContinuizedParameter {
    identifier: String,
    domain: Domain,
    scaling: DimensionScaling,
}

/// Factory for [`PartialGenomeSearchPoint`]s
#[derive(Clone)]
pub struct PartialSearchSpace {
    parameters: Vec<ContinuizedParameter>,
    builder: Arc<dyn GenomeBuilder>,
}

impl PartialSearchSpace {
    /// Create the search space of a parameter tree.
    ///
    /// A numeric parameter is continuized if it is real-valued or has at
    /// least `minimum_domain_size` values.
    pub fn new(
        tree: &ParameterTree,
        builder: Arc<dyn GenomeBuilder>,
        minimum_domain_size: u64,
    ) -> Self {
        let parameters = tree
            .parameters()
            .filter(|(_, domain)| {
                !domain.is_categorical()
                    && domain
                        .domain_size()
                        .map_or(true, |size| size >= minimum_domain_size)
            })
            .map(|(identifier, domain)| ContinuizedParameter {
                identifier: identifier.to_string(),
                domain: domain.clone(),
                scaling: scaling_for(domain),
            })
            .collect();
        Self {
            parameters,
            builder,
        }
    }

    /// Identifiers of the continuized parameters, sorted
    pub fn continuized_identifiers(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.identifier.as_str())
    }

    fn decode(&self, bounded: &[f64], underlying: &Genome) -> TuneResult<Genome> {
        let mut genome = underlying.clone();
        for (parameter, &value) in self.parameters.iter().zip(bounded) {
            let rounded = parameter
                .domain
                .round_to_valid(parameter.scaling.unstandardize(value));
            let allele = parameter.domain.allele_from_value(rounded).ok_or_else(|| {
                GenomeError::ValueOutsideDomain {
                    identifier: parameter.identifier.clone(),
                    value: rounded.to_string(),
                }
            })?;
            genome.set_gene(parameter.identifier.as_str(), allele);
        }
        Ok(genome)
    }

    /// Create a point whose fixed genes come from `underlying`
    pub fn create_with_underlying(
        &self,
        values: Vec<f64>,
        underlying: &Genome,
    ) -> TuneResult<PartialGenomeSearchPoint> {
        let point = BoundedSearchPoint::standardized(values);
        if point.dimension() != self.parameters.len() {
            return Err(SearchPointError::DimensionMismatch {
                expected: self.parameters.len(),
                actual: point.dimension(),
            }
            .into());
        }

        let mut genome = self.decode(&point.map_into_bounds(), underlying)?;
        let is_repaired = !self.builder.is_genome_valid(&genome);
        if is_repaired {
            self.builder.make_genome_valid(&mut genome);
        }

        Ok(PartialGenomeSearchPoint {
            point,
            genome,
            underlying_genome: underlying.clone(),
            is_repaired,
        })
    }
}

impl fmt::Debug for PartialSearchSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialSearchSpace")
            .field(
                "parameters",
                &self.continuized_identifiers().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SearchPointFactory for PartialSearchSpace {
    type Point = PartialGenomeSearchPoint;

    fn dimension(&self) -> usize {
        self.parameters.len()
    }

    fn create(&self, values: Vec<f64>, parent: Option<&Self::Point>) -> TuneResult<Self::Point> {
        let underlying = parent
            .and_then(SearchPoint::underlying_genome)
            .ok_or(SearchPointError::MissingUnderlyingGenome)?;
        self.create_with_underlying(values, underlying)
    }

    fn create_from_genome(&self, genome: &Genome) -> TuneResult<Self::Point> {
        let values = self
            .parameters
            .iter()
            .map(|parameter| {
                let value = genome
                    .gene_value(&parameter.identifier)
                    .ok_or_else(|| GenomeError::MissingGene(parameter.identifier.clone()))?;
                let raw = value.as_f64().ok_or_else(|| GenomeError::ValueOutsideDomain {
                    identifier: parameter.identifier.clone(),
                    value: value.to_string(),
                })?;
                Ok(parameter.scaling.standardize(raw))
            })
            .collect::<Result<Vec<_>, GenomeError>>()?;

        Ok(PartialGenomeSearchPoint {
            point: BoundedSearchPoint::standardized(values),
            genome: genome.clone(),
            underlying_genome: genome.clone(),
            is_repaired: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::builder::TreeGenomeBuilder;
    use crate::parameters::allele::Allele;
    use crate::parameters::tree::ParameterNode;
    use approx::assert_relative_eq;

    fn space() -> PartialSearchSpace {
        let tree = Arc::new(
            ParameterTree::new(ParameterNode::and(vec![
                ParameterNode::value("cat", Domain::categorical(["x", "y"]).unwrap()),
                ParameterNode::value("cont", Domain::continuous(-1.0, 1.0).unwrap()),
                ParameterNode::value("large", Domain::integer(0, 100).unwrap()),
                ParameterNode::value("small", Domain::integer(0, 3).unwrap()),
            ]))
            .unwrap(),
        );
        let builder = Arc::new(TreeGenomeBuilder::new(tree.clone()));
        PartialSearchSpace::new(&tree, builder, 5)
    }

    fn genome() -> Genome {
        Genome::from_genes(
            [
                ("cat", Allele::from("y")),
                ("cont", Allele::Float(0.0)),
                ("large", Allele::Int(40)),
                ("small", Allele::Int(2)),
            ],
            4,
        )
    }

    #[test]
    fn test_only_large_numeric_domains_are_continuized() {
        let space = space();
        assert_eq!(
            space.continuized_identifiers().collect::<Vec<_>>(),
            vec!["cont", "large"]
        );
        assert_eq!(space.dimension(), 2);
    }

    #[test]
    fn test_fixed_genes_come_from_underlying_genome() {
        let space = space();
        let parent = space.create_from_genome(&genome()).unwrap();
        assert_relative_eq!(parent.values()[0], 5.0);
        assert_relative_eq!(parent.values()[1], 4.0);

        let child = space.create(vec![10.0, 7.5], Some(&parent)).unwrap();
        let genome = child.genome();
        assert_eq!(genome.gene_value("cat"), Some(&Allele::from("y")));
        assert_eq!(genome.gene_value("small"), Some(&Allele::Int(2)));
        assert_eq!(genome.gene_value("cont"), Some(&Allele::Float(1.0)));
        assert_eq!(genome.gene_value("large"), Some(&Allele::Int(75)));
        assert_eq!(genome.age(), 4);
        assert_eq!(child.underlying_genome(), Some(&self::genome()));
    }

    #[test]
    fn test_create_without_parent_fails() {
        assert!(space().create(vec![0.0, 0.0], None).is_err());
    }
}
