//! Search points and the factories that create them
//!
//! A search point is a real vector a continuous optimizer works on, together
//! with the genome it decodes to. Factories know how to decode: they own the
//! parameter tree, the standardization and the genome builder, so points
//! themselves stay plain serializable data.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TuneResult;
use crate::genome::genome::Genome;

pub mod bounded;
pub mod continuized;
pub mod partial;

/// A point in a continuous search space that decodes to a genome
pub trait SearchPoint: Clone + Send + Sync + Serialize + DeserializeOwned {
    /// Raw position and bounds
    fn bounded_point(&self) -> &bounded::BoundedSearchPoint;

    /// The decoded, valid genome
    fn genome(&self) -> &Genome;

    /// Whether decoding produced an invalid genome that had to be repaired
    fn is_repaired(&self) -> bool;

    /// Raw values, possibly outside the bounds
    fn values(&self) -> &[f64] {
        self.bounded_point().values()
    }

    /// Genome that supplies the genes this point does not cover
    fn underlying_genome(&self) -> Option<&Genome> {
        None
    }
}

/// Creates search points of one kind
pub trait SearchPointFactory: Send + Sync {
    /// Point type produced
    type Point: SearchPoint;

    /// Dimension of the continuous space
    fn dimension(&self) -> usize;

    /// Create a point from raw values.
    ///
    /// `parent` is the point the values were derived from; factories whose
    /// points only cover part of a genome take the remaining genes from it.
    fn create(&self, values: Vec<f64>, parent: Option<&Self::Point>) -> TuneResult<Self::Point>;

    /// Create the point representing a genome
    fn create_from_genome(&self, genome: &Genome) -> TuneResult<Self::Point>;
}

pub mod prelude {
    pub use super::bounded::*;
    pub use super::continuized::*;
    pub use super::partial::*;
    pub use super::{SearchPoint, SearchPointFactory};
}
