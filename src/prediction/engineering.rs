//! Surrogate-guided offspring creation
//!
//! Instead of a blind crossover, the forest is asked where crossover children
//! of two parents can end up. A child is then assembled to land in a leaf
//! with a low predicted value.

use std::sync::Arc;

use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::Distribution;
use tracing::debug;

use super::forest::GenomePredictionForest;
use super::target_leaf::{
    compute_reachable_target_leaves, ParentGenomesConverted, TreeNodeAndFixations,
};
use crate::error::{OptimizationError, TuneResult};
use crate::genome::builder::GenomeBuilder;
use crate::genome::double_representation::GenomeDoubleRepresentation;
use crate::genome::genome::Genome;
use crate::genome::transformation::GenomeTransformation;

/// Builds offspring aimed at promising leaves of a prediction forest
pub struct GeneticEngineering {
    forest: GenomePredictionForest,
    transformation: GenomeTransformation,
    builder: Arc<dyn GenomeBuilder>,
    number_of_candidates: usize,
}

impl GeneticEngineering {
    /// Create the engineering step.
    ///
    /// The forest must be trained on features of `transformation`.
    pub fn new(
        forest: GenomePredictionForest,
        transformation: GenomeTransformation,
        builder: Arc<dyn GenomeBuilder>,
        number_of_candidates: usize,
    ) -> TuneResult<Self> {
        if number_of_candidates == 0 {
            return Err(OptimizationError::Configuration(
                "number_of_candidates must be at least 1".to_string(),
            )
            .into());
        }
        Ok(Self {
            forest,
            transformation,
            builder,
            number_of_candidates,
        })
    }

    /// The forest
    pub fn forest(&self) -> &GenomePredictionForest {
        &self.forest
    }

    /// Convert both parents to feature vectors
    pub fn convert_parents(
        &self,
        competitive: &Genome,
        non_competitive: &Genome,
    ) -> TuneResult<ParentGenomesConverted> {
        let convert = |genome: &Genome| {
            self.transformation
                .convert_genome_to_array(genome)
                .map(GenomeDoubleRepresentation::from_vec)
        };
        Ok(ParentGenomesConverted::new(
            convert(competitive)?,
            convert(non_competitive)?,
        )?)
    }

    /// Reachable leaves of every tree, in tree order
    pub fn target_leaves(
        &self,
        parents: &ParentGenomesConverted,
    ) -> TuneResult<Vec<Vec<TreeNodeAndFixations>>> {
        let groups = self.transformation.categorical_feature_groups();
        let mut leaves = Vec::with_capacity(self.forest.len());
        for tree in self.forest.trees() {
            leaves.push(compute_reachable_target_leaves(tree, parents, &groups)?);
        }
        Ok(leaves)
    }

    /// Create the most promising of `number_of_candidates` crossover children.
    ///
    /// The child has age 0.
    pub fn engineer<R: Rng>(
        &self,
        competitive: &Genome,
        non_competitive: &Genome,
        rng: &mut R,
    ) -> TuneResult<Genome> {
        let parents = self.convert_parents(competitive, non_competitive)?;
        let leaves = self.target_leaves(&parents)?;

        let mut best: Option<(Genome, f64)> = None;
        for _ in 0..self.number_of_candidates {
            let tree_leaves = &leaves[rng.gen_range(0..leaves.len())];
            let Some(target) = choose_leaf(tree_leaves, rng) else {
                continue;
            };

            let features = self.assemble_features(&parents, target, rng);
            let mut child = self.transformation.convert_back_tolerant(&features)?;
            if !self.builder.is_genome_valid(&child) {
                self.builder.make_genome_valid(&mut child);
            }
            child.set_age(0);

            let prediction = self
                .forest
                .predict(&self.transformation.convert_genome_to_array(&child)?)?;
            if best.as_ref().map_or(true, |(_, value)| prediction < *value) {
                best = Some((child, prediction));
            }
        }

        let (child, prediction) = best.ok_or_else(|| {
            OptimizationError::Configuration("no target leaf was reachable".to_string())
        })?;
        debug!(prediction, "engineered genome");
        Ok(child)
    }

    /// Parameter-wise crossover honoring the fixations of the target leaf
    fn assemble_features<R: Rng>(
        &self,
        parents: &ParentGenomesConverted,
        target: &TreeNodeAndFixations,
        rng: &mut R,
    ) -> Vec<f64> {
        let mut features = Vec::with_capacity(parents.len());
        let mut offset = 0;
        for &length in self.transformation.feature_lengths() {
            let range = offset..offset + length;
            offset += length;

            let source = match range.clone().find_map(|f| target.fixation(f)) {
                Some(fixation) => parents.parent(fixation),
                None if rng.gen_bool(0.5) => parents.competitive(),
                None => parents.non_competitive(),
            };
            features.extend_from_slice(&source.as_slice()[range]);
        }
        features
    }
}

/// Rank-based leaf weights: the lowest leaf value gets weight `count`, the
/// highest gets 1
fn leaf_weights(leaves: &[TreeNodeAndFixations]) -> Vec<f64> {
    let value = |i: usize| leaves[i].node().leaf_value().unwrap_or(f64::INFINITY);
    let mut order: Vec<usize> = (0..leaves.len()).collect();
    order.sort_by(|&a, &b| value(a).total_cmp(&value(b)));

    let mut weights = vec![0.0; leaves.len()];
    for (rank, index) in order.into_iter().enumerate() {
        weights[index] = (leaves.len() - rank) as f64;
    }
    weights
}

fn choose_leaf<'a, R: Rng>(
    leaves: &'a [TreeNodeAndFixations],
    rng: &mut R,
) -> Option<&'a TreeNodeAndFixations> {
    let distribution = WeightedIndex::new(leaf_weights(leaves)).ok()?;
    leaves.get(distribution.sample(rng))
}
