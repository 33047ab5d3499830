//! Leaves a crossover of two parents can reach
//!
//! A crossover child takes every feature from one of its two parents. At a
//! split where both parents agree, every child follows them. Where they
//! disagree, a child reaches a side only by taking the split feature from
//! the parent that goes there, which fixes that feature for the rest of the
//! walk.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tree::{GenomePredictionTree, TreeNode};
use crate::error::PredictionError;
use crate::genome::double_representation::GenomeDoubleRepresentation;

/// Parent a feature has to be taken from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetLeafGenomeFixation {
    /// Take the feature from the competitive parent
    FixedToCompetitiveParent,
    /// Take the feature from the non-competitive parent
    FixedToNonCompetitiveParent,
}

impl TargetLeafGenomeFixation {
    /// The other parent
    pub fn other(self) -> Self {
        match self {
            Self::FixedToCompetitiveParent => Self::FixedToNonCompetitiveParent,
            Self::FixedToNonCompetitiveParent => Self::FixedToCompetitiveParent,
        }
    }
}

/// Feature index to fixation, shared between traversal steps until one of
/// them adds a fixation
pub type Fixations = Arc<BTreeMap<usize, TargetLeafGenomeFixation>>;

/// Converted competitive and non-competitive parent of a crossover
#[derive(Clone, Debug, PartialEq)]
pub struct ParentGenomesConverted {
    competitive: GenomeDoubleRepresentation,
    non_competitive: GenomeDoubleRepresentation,
}

impl ParentGenomesConverted {
    /// Pair two representations of equal length
    pub fn new(
        competitive: GenomeDoubleRepresentation,
        non_competitive: GenomeDoubleRepresentation,
    ) -> Result<Self, PredictionError> {
        if competitive.len() != non_competitive.len() {
            return Err(PredictionError::ParentLengthMismatch {
                competitive: competitive.len(),
                non_competitive: non_competitive.len(),
            });
        }
        Ok(Self {
            competitive,
            non_competitive,
        })
    }

    /// Competitive parent
    pub fn competitive(&self) -> &GenomeDoubleRepresentation {
        &self.competitive
    }

    /// Non-competitive parent
    pub fn non_competitive(&self) -> &GenomeDoubleRepresentation {
        &self.non_competitive
    }

    /// Parent a fixation refers to
    pub fn parent(&self, fixation: TargetLeafGenomeFixation) -> &GenomeDoubleRepresentation {
        match fixation {
            TargetLeafGenomeFixation::FixedToCompetitiveParent => &self.competitive,
            TargetLeafGenomeFixation::FixedToNonCompetitiveParent => &self.non_competitive,
        }
    }

    /// Length of both representations
    pub fn len(&self) -> usize {
        self.competitive.len()
    }

    /// Whether the representations are empty
    pub fn is_empty(&self) -> bool {
        self.competitive.is_empty()
    }
}

/// A tree node together with the fixations needed to get there
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNodeAndFixations {
    node_index: usize,
    node: TreeNode,
    fixations: Fixations,
}

impl TreeNodeAndFixations {
    fn new(node_index: usize, node: TreeNode, fixations: Fixations) -> Self {
        Self {
            node_index,
            node,
            fixations,
        }
    }

    /// Index of the node in its tree
    pub fn node_index(&self) -> usize {
        self.node_index
    }

    /// The node
    pub fn node(&self) -> &TreeNode {
        &self.node
    }

    /// Fixations required to reach the node
    pub fn fixations(&self) -> &BTreeMap<usize, TargetLeafGenomeFixation> {
        &self.fixations
    }

    /// Fixation of a feature, if any
    pub fn fixation(&self, feature: usize) -> Option<TargetLeafGenomeFixation> {
        self.fixations.get(&feature).copied()
    }
}

/// All leaves some crossover child of `parents` can fall into, in
/// breadth-first discovery order.
///
/// Features in one of `categorical_feature_groups` encode the same parameter
/// and are always fixed together. An empty slice means no grouping.
pub fn compute_reachable_target_leaves(
    tree: &GenomePredictionTree,
    parents: &ParentGenomesConverted,
    categorical_feature_groups: &[Vec<usize>],
) -> Result<Vec<TreeNodeAndFixations>, PredictionError> {
    let root = *tree.root()?;
    let mut queue = VecDeque::new();
    queue.push_back(TreeNodeAndFixations::new(0, root, Fixations::default()));
    let mut leaves = Vec::new();

    while let Some(current) = queue.pop_front() {
        let TreeNode::Split {
            feature,
            value,
            left,
            right,
        } = current.node
        else {
            leaves.push(current);
            continue;
        };

        let direction = |parent: &GenomeDoubleRepresentation| -> Result<usize, PredictionError> {
            let x = parent
                .as_slice()
                .get(feature)
                .ok_or(PredictionError::FeatureOutOfRange {
                    index: feature,
                    length: parent.len(),
                })?;
            Ok(if *x <= value { left } else { right })
        };
        let competitive_child = direction(parents.competitive())?;
        let non_competitive_child = direction(parents.non_competitive())?;

        if competitive_child == non_competitive_child {
            let child = *tree.node(competitive_child)?;
            queue.push_back(TreeNodeAndFixations::new(
                competitive_child,
                child,
                current.fixations,
            ));
            continue;
        }

        let group = categorical_feature_groups
            .iter()
            .find(|group| group.contains(&feature));
        for (fixation, child_index) in [
            (
                TargetLeafGenomeFixation::FixedToCompetitiveParent,
                competitive_child,
            ),
            (
                TargetLeafGenomeFixation::FixedToNonCompetitiveParent,
                non_competitive_child,
            ),
        ] {
            if current.fixation(feature) == Some(fixation.other()) {
                continue;
            }
            let mut fixations = current.fixations.clone();
            let map = Arc::make_mut(&mut fixations);
            match group {
                Some(group) => map.extend(group.iter().map(|&f| (f, fixation))),
                None => {
                    map.insert(feature, fixation);
                }
            }
            let child = *tree.node(child_index)?;
            queue.push_back(TreeNodeAndFixations::new(child_index, child, fixations));
        }
    }

    Ok(leaves)
}
