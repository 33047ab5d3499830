//! Fully continuized genome search space
//!
//! Every parameter of the tree becomes one standardized dimension: numeric
//! parameters are scaled from their domain (log-scaled domains in log
//! space), categorical parameters by their ordinal index.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TuneResult;
use crate::genome::builder::GenomeBuilder;
use crate::genome::genome::Genome;
use crate::genome::transformation::{CategoricalEncoding, GenomeTransformation};
use crate::parameters::domain::Domain;
use crate::parameters::tree::ParameterTree;
use crate::search_point::bounded::{BoundedSearchPoint, DimensionScaling};
use crate::search_point::{SearchPoint, SearchPointFactory};

/// Search point covering every parameter of a genome
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContinuizedGenomeSearchPoint {
    point: BoundedSearchPoint,
    genome: Genome,
    is_repaired: bool,
}

impl SearchPoint for ContinuizedGenomeSearchPoint {
    fn bounded_point(&self) -> &BoundedSearchPoint {
        &self.point
    }

    fn genome(&self) -> &Genome {
        &self.genome
    }

    fn is_repaired(&self) -> bool {
        self.is_repaired
    }
}

/// Scaling of a domain into the standardized interval
pub(crate) fn scaling_for(domain: &Domain) -> DimensionScaling {
    match domain {
        Domain::Categorical { values, .. } => {
            DimensionScaling::linear(0.0, (values.len() - 1) as f64)
        }
        Domain::Log { min, max, .. } => DimensionScaling::logarithmic(*min, *max),
        Domain::DiscreteLog { min, max, .. } => {
            DimensionScaling::logarithmic(*min as f64, *max as f64)
        }
        Domain::Continuous { min, max, .. } => DimensionScaling::linear(*min, *max),
        Domain::Integer { min, max, .. } => DimensionScaling::linear(*min as f64, *max as f64),
    }
}

/// Factory for [`ContinuizedGenomeSearchPoint`]s
#[derive(Clone)]
pub struct ContinuizedSearchSpace {
    transformation: GenomeTransformation,
    builder: Arc<dyn GenomeBuilder>,
    scalings: Vec<DimensionScaling>,
}

impl ContinuizedSearchSpace {
    /// Create the search space of a parameter tree
    pub fn new(tree: Arc<ParameterTree>, builder: Arc<dyn GenomeBuilder>) -> Self {
        let scalings = tree.parameters().map(|(_, domain)| scaling_for(domain)).collect();
        Self {
            transformation: GenomeTransformation::new(tree, CategoricalEncoding::Ordinal),
            builder,
            scalings,
        }
    }

    /// The ordinal transformation backing the space
    pub fn transformation(&self) -> &GenomeTransformation {
        &self.transformation
    }
}

impl fmt::Debug for ContinuizedSearchSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuizedSearchSpace")
            .field("dimension", &self.scalings.len())
            .finish()
    }
}

impl SearchPointFactory for ContinuizedSearchSpace {
    type Point = ContinuizedGenomeSearchPoint;

    fn dimension(&self) -> usize {
        self.scalings.len()
    }

    fn create(&self, values: Vec<f64>, _parent: Option<&Self::Point>) -> TuneResult<Self::Point> {
        let point = BoundedSearchPoint::standardized(values);
        let raw: Vec<f64> = point
            .map_into_bounds()
            .iter()
            .zip(&self.scalings)
            .map(|(&value, scaling)| scaling.unstandardize(value))
            .collect();

        let mut genome = self.transformation.convert_back_tolerant(&raw)?;
        let is_repaired = !self.builder.is_genome_valid(&genome);
        if is_repaired {
            self.builder.make_genome_valid(&mut genome);
        }

        Ok(ContinuizedGenomeSearchPoint {
            point,
            genome,
            is_repaired,
        })
    }

    fn create_from_genome(&self, genome: &Genome) -> TuneResult<Self::Point> {
        let values = self
            .transformation
            .convert_genome_to_array(genome)?
            .into_iter()
            .zip(&self.scalings)
            .map(|(value, scaling)| scaling.standardize(value))
            .collect();

        Ok(ContinuizedGenomeSearchPoint {
            point: BoundedSearchPoint::standardized(values),
            genome: genome.clone(),
            is_repaired: false,
        })
    }
}
