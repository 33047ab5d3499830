//! Ranking of search points
//!
//! The continuous optimizers never evaluate genomes themselves. Each
//! generation they hand their points to a [`SearchPointSorter`], usually a
//! front for the tuner's distributed evaluation, and block until it returns
//! a ranking.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{OptimizationError, TuneResult};
use crate::genome::genome::Genome;
use crate::search_point::SearchPoint;

/// Ranks search points, best first
pub trait SearchPointSorter<P: SearchPoint> {
    /// Return the indices of `points`, best point first.
    ///
    /// Must be a total order; ties have to be broken by the sorter. An
    /// evaluation layer that gives up reports
    /// [`OptimizationError::SortingFailed`]; the engines pass it on without
    /// changing their state.
    fn sort(&mut self, points: &[P]) -> TuneResult<Vec<usize>>;
}

/// Check that a ranking is a permutation of `0..len`
pub fn validate_ranking(ranking: &[usize], len: usize) -> Result<(), OptimizationError> {
    if ranking.len() != len {
        return Err(OptimizationError::InvalidSorting(format!(
            "expected {} ranked points, got {}",
            len,
            ranking.len()
        )));
    }
    let mut seen = vec![false; len];
    for &index in ranking {
        match seen.get_mut(index) {
            Some(flag) if !*flag => *flag = true,
            Some(_) => {
                return Err(OptimizationError::InvalidSorting(format!(
                    "index {} ranked twice",
                    index
                )))
            }
            None => {
                return Err(OptimizationError::InvalidSorting(format!(
                    "index {} out of range",
                    index
                )))
            }
        }
    }
    Ok(())
}

/// Sorter ranking points by a cost function of their genomes
///
/// Lower cost is better. NaN costs rank last and ties keep the input order,
/// so the ranking is deterministic. With the `parallel` feature the genomes
/// are evaluated with rayon.
pub struct GenomeFitnessSorter<F> {
    cost: F,
    evaluations: usize,
}

impl<F> GenomeFitnessSorter<F>
where
    F: Fn(&Genome) -> f64 + Sync,
{
    /// Create a sorter from a cost function
    pub fn new(cost: F) -> Self {
        Self {
            cost,
            evaluations: 0,
        }
    }

    /// Number of genomes evaluated so far
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    #[cfg(feature = "parallel")]
    fn costs<P: SearchPoint>(&self, points: &[P]) -> Vec<f64> {
        points.par_iter().map(|p| (self.cost)(p.genome())).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn costs<P: SearchPoint>(&self, points: &[P]) -> Vec<f64> {
        points.iter().map(|p| (self.cost)(p.genome())).collect()
    }
}

impl<F, P> SearchPointSorter<P> for GenomeFitnessSorter<F>
where
    F: Fn(&Genome) -> f64 + Sync,
    P: SearchPoint,
{
    fn sort(&mut self, points: &[P]) -> TuneResult<Vec<usize>> {
        let costs = self.costs(points);
        self.evaluations += points.len();

        let mut ranking: Vec<usize> = (0..points.len()).collect();
        ranking.sort_by(|&a, &b| {
            let (ca, cb) = (costs[a], costs[b]);
            match (ca.is_nan(), cb.is_nan()) {
                (false, false) => ca.total_cmp(&cb),
                (a_nan, b_nan) => a_nan.cmp(&b_nan),
            }
        });
        Ok(ranking)
    }
}
