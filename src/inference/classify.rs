//! Majority-vote classification.

use ndarray::ArrayView2;
use rand::Rng;

use crate::repr::{Forest, TreeOracle, check_width};
use crate::ForestError;

impl<T: TreeOracle> Forest<T> {
    /// Most popular tree label per row.
    ///
    /// Ties are broken uniformly at random with `rng`; a seeded generator
    /// makes the result reproducible.
    pub fn classify<R: Rng + ?Sized>(&self, rows: ArrayView2<'_, f64>, rng: &mut R) -> Result<Vec<f64>, ForestError> {
        check_width(self.n_features(), rows.ncols())?;
        let votes = self.map_trees(|tree| tree.classify(rows));

        let mut labels = Vec::with_capacity(rows.nrows());
        let mut row_votes = Vec::with_capacity(self.n_trees());
        for row in 0..rows.nrows() {
            row_votes.clear();
            row_votes.extend(votes.iter().map(|tree_votes| tree_votes[row]));
            let tied = modes(&row_votes);
            labels.push(tied[rng.random_range(0..tied.len())]);
        }
        Ok(labels)
    }
}

/// Every value tied for the highest count, ascending. Values compare by bit
/// pattern.
pub fn modes(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let mut best = Vec::new();
    let mut best_count = 0;
    for run in sorted.chunk_by(|a, b| a.to_bits() == b.to_bits()) {
        if run.len() > best_count {
            best_count = run.len();
            best.clear();
        }
        if run.len() == best_count {
            best.push(run[0]);
        }
    }
    best
}
