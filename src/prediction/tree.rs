//! Binary regression tree over genome feature vectors

use serde::{Deserialize, Serialize};

use crate::error::PredictionError;

/// Node of a [`GenomePredictionTree`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Inner node: features `<= value` go left, all others go right
    Split {
        feature: usize,
        value: f64,
        left: usize,
        right: usize,
    },
    /// Leaf predicting a value
    Leaf { value: f64 },
}

impl TreeNode {
    /// Whether the node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Prediction of a leaf
    pub fn leaf_value(&self) -> Option<f64> {
        match self {
            Self::Leaf { value } => Some(*value),
            Self::Split { .. } => None,
        }
    }
}

/// Trained regression tree, stored as an array of nodes with the root at
/// index 0
///
/// Children always have a larger index than their parent, so every walk
/// through the tree ends after at most `node_count` steps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenomePredictionTree {
    nodes: Vec<TreeNode>,
}

impl GenomePredictionTree {
    /// Create a tree from its nodes
    pub fn new(nodes: Vec<TreeNode>) -> Result<Self, PredictionError> {
        let node_count = nodes.len();
        for (index, node) in nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = node {
                for &child in [left, right] {
                    if child <= index || child >= node_count {
                        return Err(PredictionError::InvalidNodeIndex {
                            index: child,
                            node_count,
                        });
                    }
                }
            }
        }
        Ok(Self { nodes })
    }

    /// A tree without nodes
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The root node
    pub fn root(&self) -> Result<&TreeNode, PredictionError> {
        self.nodes.first().ok_or(PredictionError::EmptyTree)
    }

    /// Node at an index
    pub fn node(&self, index: usize) -> Result<&TreeNode, PredictionError> {
        self.nodes.get(index).ok_or(PredictionError::InvalidNodeIndex {
            index,
            node_count: self.nodes.len(),
        })
    }

    /// Indexes of all leaves
    pub fn leaf_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_leaf())
            .map(|(index, _)| index)
    }

    /// Index of the leaf a feature vector falls into
    pub fn leaf_index(&self, features: &[f64]) -> Result<usize, PredictionError> {
        let mut index = 0;
        let mut node = self.root()?;
        while let TreeNode::Split {
            feature,
            value,
            left,
            right,
        } = *node
        {
            let x = features
                .get(feature)
                .ok_or(PredictionError::FeatureOutOfRange {
                    index: feature,
                    length: features.len(),
                })?;
            index = if *x <= value { left } else { right };
            node = self.node(index)?;
        }
        Ok(index)
    }

    /// Predicted value of a feature vector
    pub fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let leaf = self.leaf_index(features)?;
        self.node(leaf)?
            .leaf_value()
            .ok_or(PredictionError::InvalidNodeIndex {
                index: leaf,
                node_count: self.nodes.len(),
            })
    }
}
