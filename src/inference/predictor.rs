//! Point prediction over design-matrix rows.

use ndarray::{Array2, ArrayView2};

use super::aggregate::{ResponseTransform, combine_trees};
use super::Predictions;
use crate::repr::{Forest, LeafStats, NodeId, TreeOracle, check_width};
use crate::ForestError;

impl<T: TreeOracle> Forest<T> {
    /// Leaf reached in every tree by every row: `n_trees x n_rows`.
    ///
    /// # Errors
    ///
    /// [`ForestError::FeatureCountMismatch`] if rows are not `K + L` wide.
    pub fn leaf_indices(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<NodeId>, ForestError> {
        check_width(self.n_features(), rows.ncols())?;
        let per_tree = self.map_trees(|tree| tree.forward_batch(rows));
        Ok(Array2::from_shape_fn((self.n_trees(), rows.nrows()), |(t, r)| per_tree[t][r]))
    }

    /// Ensemble mean and variance for each design-matrix row.
    ///
    /// Log models report log10-space statistics obtained by moment matching
    /// each leaf, or by the legacy `log10(pred)` formula when
    /// `broken_variance_calculation` is set.
    ///
    /// # Errors
    ///
    /// [`ForestError::FeatureCountMismatch`] if rows are not `K + L` wide.
    pub fn apply(&self, rows: ArrayView2<'_, f64>) -> Result<Predictions, ForestError> {
        check_width(self.n_features(), rows.ncols())?;
        let transform = ResponseTransform::for_prediction(self.config());
        let per_tree: Vec<Vec<LeafStats>> = self.map_trees(|tree| {
            tree.forward_batch(rows)
                .into_iter()
                .map(|leaf| transform.apply(tree.leaf_stats(leaf)))
                .collect()
        });
        Ok(combine_trees(
            &per_tree,
            rows.nrows(),
            self.n_trees(),
            self.config().min_variance,
        ))
    }

    /// [`Self::apply`] quantized to reference precision.
    pub fn apply_rounded(&self, rows: ArrayView2<'_, f64>) -> Result<Predictions, ForestError> {
        Ok(self.apply(rows)?.rounded())
    }
}
