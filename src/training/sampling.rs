//! Bootstrap sampling of per-tree training subsets.
//!
//! Every tree of the forest is fitted on its own multiset of run indices.
//! With bootstrapping on, each entry is drawn uniformly from `[0, N)` with
//! replacement; with it off, every tree receives `[0, 1, .., N-1]`.
//!
//! Draw order is fixed: tree 0 is filled completely before tree 1, and
//! within a tree row 0 is drawn before row 1. A seeded generator therefore
//! reproduces the whole table.

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ForestError;

// ============================================================================
// BootstrapAssignment
// ============================================================================

/// `n_trees x n_draws` table of run indices; row `i` is tree `i`'s subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapAssignment {
    indices: Array2<usize>,
}

impl BootstrapAssignment {
    pub fn new(indices: Array2<usize>) -> Self {
        Self { indices }
    }

    /// Every tree gets every run, in order.
    pub fn identity(n_trees: usize, n_samples: usize) -> Self {
        Self {
            indices: Array2::from_shape_fn((n_trees, n_samples), |(_, j)| j),
        }
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.indices.nrows()
    }

    /// Number of runs drawn per tree.
    #[inline]
    pub fn n_draws(&self) -> usize {
        self.indices.ncols()
    }

    /// Run indices for `tree`.
    #[inline]
    pub fn tree(&self, tree: usize) -> ArrayView1<'_, usize> {
        self.indices.row(tree)
    }

    pub fn as_array(&self) -> &Array2<usize> {
        &self.indices
    }

    /// Check that the table has one row per tree and only references
    /// existing runs.
    pub fn validate(&self, n_trees: usize, n_samples: usize) -> Result<(), ForestError> {
        if self.n_trees() != n_trees {
            return Err(ForestError::AssignmentLenMismatch {
                expected: n_trees,
                got: self.n_trees(),
            });
        }
        for (tree, row) in self.indices.rows().into_iter().enumerate() {
            if let Some(&index) = row.iter().find(|&&i| i >= n_samples) {
                return Err(ForestError::AssignmentIndexOutOfRange {
                    tree,
                    index,
                    n_samples,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// BootstrapSampler
// ============================================================================

/// Draws [`BootstrapAssignment`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapSampler {
    do_bootstrapping: bool,
}

impl BootstrapSampler {
    pub fn new(do_bootstrapping: bool) -> Self {
        Self { do_bootstrapping }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.do_bootstrapping
    }

    /// Draw an `n_trees x n_samples` table from `rng`.
    ///
    /// Consumes no randomness when bootstrapping is disabled.
    pub fn sample<R: Rng + ?Sized>(&self, n_samples: usize, n_trees: usize, rng: &mut R) -> BootstrapAssignment {
        if !self.do_bootstrapping {
            return BootstrapAssignment::identity(n_trees, n_samples);
        }

        // from_shape_fn visits indices in row-major order.
        BootstrapAssignment {
            indices: Array2::from_shape_fn((n_trees, n_samples), |_| rng.random_range(0..n_samples)),
        }
    }
}
