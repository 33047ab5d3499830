//! Tree-based performance prediction
//!
//! The forest itself is trained elsewhere. This module evaluates trained
//! trees and uses them to steer crossover towards promising leaves.

pub mod engineering;
pub mod forest;
pub mod target_leaf;
pub mod tree;

pub mod prelude {
    pub use super::engineering::GeneticEngineering;
    pub use super::forest::GenomePredictionForest;
    pub use super::target_leaf::*;
    pub use super::tree::{GenomePredictionTree, TreeNode};
}
