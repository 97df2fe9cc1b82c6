//! Predictions marginalized over an instance population.
//!
//! Each selected tree reports per-configuration statistics already averaged
//! over the instances. The forest then combines them like point
//! predictions, with two differences:
//!
//! - log models apply only `log10` to the tree mean (no moment matching)
//! - the Bessel factor uses the full forest size even when only a subset
//!   of trees is selected

use ndarray::{Array2, ArrayView2};

use super::aggregate::{ResponseTransform, combine_trees};
use super::Predictions;
use crate::repr::{Forest, LeafStats, TreeOracle, check_width};
use crate::ForestError;

impl<T: TreeOracle> Forest<T> {
    fn check_marginal_query(
        &self,
        tree_idxs: &[usize],
        configurations: ArrayView2<'_, f64>,
        instances: Option<ArrayView2<'_, f64>>,
    ) -> Result<(), ForestError> {
        if tree_idxs.is_empty() {
            return Err(ForestError::EmptyTreeSelection);
        }
        if let Some(&index) = tree_idxs.iter().find(|&&i| i >= self.n_trees()) {
            return Err(ForestError::TreeIndexOutOfRange {
                index,
                n_trees: self.n_trees(),
            });
        }
        check_width(self.n_config_features(), configurations.ncols())?;
        if let Some(instances) = instances {
            check_width(self.n_instance_features(), instances.ncols())?;
        }
        Ok(())
    }

    /// Transformed per-tree marginal statistics, `[selected tree][config]`.
    fn marginal_contributions(
        &self,
        tree_idxs: &[usize],
        configurations: ArrayView2<'_, f64>,
        instances: Option<ArrayView2<'_, f64>>,
    ) -> Result<Vec<Vec<LeafStats>>, ForestError> {
        self.check_marginal_query(tree_idxs, configurations, instances)?;
        let transform = ResponseTransform::for_marginal(self.config());
        Ok(self.map_selected(tree_idxs, |tree| {
            tree.marginal_forward(configurations, instances)
                .into_iter()
                .map(|stats| transform.apply(stats))
                .collect()
        }))
    }

    /// Marginal mean and variance per configuration, using the trees at
    /// `tree_idxs` (in that order).
    ///
    /// `instances = None` marginalizes over the population the trees were
    /// prepared with, or else their training instances.
    ///
    /// # Errors
    ///
    /// - [`ForestError::EmptyTreeSelection`] for an empty selection
    /// - [`ForestError::TreeIndexOutOfRange`] for an unknown tree
    /// - [`ForestError::FeatureCountMismatch`] for mis-sized rows
    pub fn apply_marginal(
        &self,
        tree_idxs: &[usize],
        configurations: ArrayView2<'_, f64>,
        instances: Option<ArrayView2<'_, f64>>,
    ) -> Result<Predictions, ForestError> {
        let per_tree = self.marginal_contributions(tree_idxs, configurations, instances)?;
        Ok(combine_trees(
            &per_tree,
            configurations.nrows(),
            self.n_trees(),
            self.config().min_variance,
        ))
    }

    /// [`Self::apply_marginal`] quantized to reference precision.
    pub fn apply_marginal_rounded(
        &self,
        tree_idxs: &[usize],
        configurations: ArrayView2<'_, f64>,
        instances: Option<ArrayView2<'_, f64>>,
    ) -> Result<Predictions, ForestError> {
        Ok(self.apply_marginal(tree_idxs, configurations, instances)?.rounded())
    }

    /// Per-tree marginal means without aggregation: `n_configs x n_selected`.
    pub fn marginal_tree_predictions(
        &self,
        tree_idxs: &[usize],
        configurations: ArrayView2<'_, f64>,
        instances: Option<ArrayView2<'_, f64>>,
    ) -> Result<Array2<f64>, ForestError> {
        let per_tree = self.marginal_contributions(tree_idxs, configurations, instances)?;
        Ok(Array2::from_shape_fn(
            (configurations.nrows(), tree_idxs.len()),
            |(c, t)| per_tree[t][c].mean,
        ))
    }
}
