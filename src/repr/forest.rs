//! Canonical forest representation (ordered collection of trees).

use std::hash::{DefaultHasher, Hash, Hasher};

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::{RegressionTree, TreeOracle, TreeValidationError};
use crate::model::ForestConfig;
use crate::utils::run_with_threads;
use crate::ForestError;

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestValidationError {
    #[error("forest has no trees")]
    Empty,

    #[error("tree {tree_idx}: {error}")]
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
}

/// Bagged ensemble of regression trees.
///
/// Immutable once built: prediction only reads it, and the `prepare_*`
/// methods return new forests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest<T = RegressionTree> {
    trees: Vec<T>,
    config: ForestConfig,
    n_config_features: usize,
    n_instance_features: usize,
}

impl<T: TreeOracle> Forest<T> {
    /// Assemble a forest from fitted trees.
    ///
    /// # Errors
    ///
    /// [`ForestError::InvalidTreeCount`] if `trees` is empty.
    pub fn from_trees(
        trees: Vec<T>,
        config: ForestConfig,
        n_config_features: usize,
        n_instance_features: usize,
    ) -> Result<Self, ForestError> {
        if trees.is_empty() {
            return Err(ForestError::InvalidTreeCount(0));
        }
        Ok(Self {
            trees,
            config,
            n_config_features,
            n_instance_features,
        })
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn tree(&self, idx: usize) -> &T {
        &self.trees[idx]
    }

    pub fn trees(&self) -> impl Iterator<Item = &T> {
        self.trees.iter()
    }

    #[inline]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    #[inline]
    pub fn log_model(&self) -> bool {
        self.config.log_model
    }

    /// Width of a configuration row.
    #[inline]
    pub fn n_config_features(&self) -> usize {
        self.n_config_features
    }

    /// Width of an instance row.
    #[inline]
    pub fn n_instance_features(&self) -> usize {
        self.n_instance_features
    }

    /// Width of a design-matrix row.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_config_features + self.n_instance_features
    }

    /// Check every tree against this forest's feature widths.
    ///
    /// Forests built by the trainer always pass; a failure means the forest
    /// was decoded from damaged or foreign bytes and prediction could panic.
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        if self.trees.is_empty() {
            return Err(ForestValidationError::Empty);
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_config_features, self.n_instance_features)
                .map_err(|error| ForestValidationError::InvalidTree { tree_idx, error })?;
        }
        Ok(())
    }

    /// Copy whose trees cache marginalization counts for `instances`.
    ///
    /// Marginal queries without an explicit population then use `instances`
    /// and return the same values as passing it explicitly.
    pub fn prepare_for_marginal(&self, instances: ArrayView2<'_, f64>) -> Result<Self, ForestError> {
        check_width(self.n_instance_features, instances.ncols())?;
        let trees = self.map_trees(|tree| tree.prepare_for_marginal(instances));
        Ok(self.with_trees(trees))
    }

    /// Copy whose trees cache their leaf labels.
    pub fn prepare_for_classification(&self) -> Self {
        let trees = self.map_trees(|tree| tree.prepare_for_classification());
        self.with_trees(trees)
    }

    /// Apply `f` to every tree, in parallel when configured. Results are in
    /// tree order.
    pub(crate) fn map_trees<B, F>(&self, f: F) -> Vec<B>
    where
        B: Send,
        F: Fn(&T) -> B + Sync + Send,
    {
        run_with_threads(self.config.thread_count(), |parallelism| {
            parallelism.maybe_par_map(&self.trees, |tree| f(tree))
        })
    }

    /// Apply `f` to the trees at `tree_idxs`, in the given order.
    pub(crate) fn map_selected<B, F>(&self, tree_idxs: &[usize], f: F) -> Vec<B>
    where
        B: Send,
        F: Fn(&T) -> B + Sync + Send,
    {
        run_with_threads(self.config.thread_count(), |parallelism| {
            parallelism.maybe_par_map(tree_idxs, |&idx| f(&self.trees[idx]))
        })
    }

    fn with_trees(&self, trees: Vec<T>) -> Self {
        Self {
            trees,
            config: self.config.clone(),
            n_config_features: self.n_config_features,
            n_instance_features: self.n_instance_features,
        }
    }
}

impl<T: Hash> Forest<T> {
    /// Structural hash over tree count, log-model flag and every tree.
    ///
    /// Stable within one build of the crate; not meant for storage.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.trees.len().hash(&mut hasher);
        self.config.log_model.hash(&mut hasher);
        for tree in &self.trees {
            tree.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Forests are equal when they have the same trees and log-model flag.
impl<T: PartialEq> PartialEq for Forest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.trees.len() == other.trees.len()
            && self.config.log_model == other.config.log_model
            && self.trees == other.trees
    }
}

#[inline]
pub(crate) fn check_width(expected: usize, got: usize) -> Result<(), ForestError> {
    if expected != got {
        return Err(ForestError::FeatureCountMismatch { expected, got });
    }
    Ok(())
}
