//! Genomes and their real-valued representations
//!
//! This module provides the [`Genome`](genome::Genome) type, the
//! [`GenomeBuilder`](builder::GenomeBuilder) validity oracle, and the
//! conversions between genomes and feature vectors.

pub mod builder;
#[allow(clippy::module_inception)]
pub mod genome;
pub mod double_representation;
pub mod transformation;

pub mod prelude {
    pub use super::builder::*;
    pub use super::double_representation::*;
    pub use super::genome::*;
    pub use super::transformation::*;
}
