//! Ensemble of regression trees

use serde::{Deserialize, Serialize};

use super::tree::GenomePredictionTree;
use crate::error::PredictionError;

/// Trained forest; predictions are the mean over all trees
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenomePredictionForest {
    trees: Vec<GenomePredictionTree>,
}

impl GenomePredictionForest {
    /// Create a forest from at least one tree
    pub fn new(trees: Vec<GenomePredictionTree>) -> Result<Self, PredictionError> {
        if trees.is_empty() {
            return Err(PredictionError::EmptyForest);
        }
        Ok(Self { trees })
    }

    /// The trees
    pub fn trees(&self) -> &[GenomePredictionTree] {
        &self.trees
    }

    /// Number of trees
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Always false, a forest has at least one tree
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Mean prediction of all trees
    pub fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict(features)?;
        }
        Ok(sum / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::tree::TreeNode;
    use approx::assert_relative_eq;

    fn stump(low: f64, high: f64) -> GenomePredictionTree {
        GenomePredictionTree::new(vec![
            TreeNode::Split {
                feature: 0,
                value: 0.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: low },
            TreeNode::Leaf { value: high },
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_forest_is_rejected() {
        assert_eq!(
            GenomePredictionForest::new(vec![]),
            Err(PredictionError::EmptyForest)
        );
    }

    #[test]
    fn test_predict_averages_trees() {
        let forest = GenomePredictionForest::new(vec![stump(1.0, 4.0), stump(2.0, 8.0)]).unwrap();
        assert_eq!(forest.len(), 2);
        assert_relative_eq!(forest.predict(&[-1.0]).unwrap(), 1.5);
        assert_relative_eq!(forest.predict(&[1.0]).unwrap(), 6.0);
    }

    #[test]
    fn test_predict_propagates_tree_errors() {
        let forest = GenomePredictionForest::new(vec![stump(1.0, 4.0)]).unwrap();
        assert!(forest.predict(&[]).is_err());
    }
}
