//! # gray-tune
//!
//! Continuous refinement for genetic algorithm tuners.
//!
//! A genetic tuner searches a tree of conditional parameters. Every few
//! generations, this crate takes its population, continuizes the genomes into
//! real vectors, and refines them with CMA-ES or JADE differential evolution
//! before handing an updated competitive population back. Separately, a
//! trained regression forest can steer crossover towards promising leaves.
//!
//! ## Core Concepts
//!
//! - **Genome transformation**: genomes map to fixed-order feature vectors and
//!   back, with ordinal, binary or one-hot categorical encodings
//! - **Search points**: bounded real vectors decoding to (repaired) genomes
//! - **Engines**: CMA-ES with pluggable termination criteria, and JADE
//! - **Strategies**: one refinement phase over a population, with a local or
//!   global information flow
//! - **Status dumps**: every phase can be resumed from disk
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gray_tune::prelude::*;
//! use rand::SeedableRng;
//! use std::sync::Arc;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let tree = Arc::new(ParameterTree::from_json(tree_json)?);
//! let builder = Arc::new(TreeGenomeBuilder::new(tree.clone()));
//!
//! let mut strategy = CmaEsStrategy::new(tree, builder, StrategyConfiguration::default())?;
//! strategy.initialize(population, Some(incumbent), &mut rng)?;
//! let mut sorter = GenomeFitnessSorter::new(|genome: &Genome| run_target(genome));
//! let population = strategy.run_phase(&mut sorter, &mut rng)?;
//! ```

pub mod algorithms;
pub mod checkpoint;
pub mod error;
pub mod genome;
pub mod parameters;
pub mod prediction;
pub mod search_point;
pub mod sorting;
pub mod strategies;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::checkpoint::prelude::*;
    pub use crate::error::*;
    pub use crate::genome::prelude::*;
    pub use crate::parameters::prelude::*;
    pub use crate::prediction::prelude::*;
    pub use crate::search_point::prelude::*;
    pub use crate::sorting::*;
    pub use crate::strategies::prelude::*;
    pub use crate::termination::prelude::*;
}
