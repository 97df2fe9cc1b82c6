//! The contract between the ensemble and its individual trees.
//!
//! The forest never looks inside a tree. It fits trees from bootstrap
//! samples, asks them which leaf each query row reaches, reads leaf
//! statistics and asks for instance-marginalized statistics per
//! configuration. Anything implementing [`TreeOracle`] can back a
//! [`Forest`](super::Forest).

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::RunPair;
use crate::model::ForestConfig;

/// Index of a node inside one tree (0 = root).
pub type NodeId = u32;

/// Point prediction and variance reported by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LeafStats {
    pub mean: f64,
    pub variance: f64,
}

/// Structural defects a tree can carry, typically from a foreign or
/// hand-edited model file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,

    /// A per-node array does not have the expected length.
    #[error("{field} has length {len}, expected {expected}")]
    LenMismatch {
        field: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("node {node}: {side} child {child} out of bounds ({n_nodes} nodes)")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },

    #[error("node {node} is its own child")]
    SelfLoop { node: NodeId },

    /// Reached by more than one path.
    #[error("node {node} is reached twice")]
    DuplicateVisit { node: NodeId },

    #[error("cycle through node {node}")]
    CycleDetected { node: NodeId },

    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },

    #[error("node {node} splits on feature {feature}, but rows have {n_features}")]
    FeatureOutOfRange {
        node: NodeId,
        feature: usize,
        n_features: usize,
    },

    /// Response offsets decrease or run past the response buffer.
    #[error("response offsets of node {node} are out of order or out of bounds")]
    BadResponseOffsets { node: NodeId },

    #[error("{what} is {got}, expected {expected}")]
    WidthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

impl LeafStats {
    #[inline]
    pub const fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }
}

/// One tree's training subset.
///
/// Configurations and instances are shared by every tree; `pairs` and
/// `responses` are the bootstrap-selected runs, in draw order. Trees that
/// keep their training instances clone the `Arc`, so one forest holds a
/// single copy.
#[derive(Debug, Clone)]
pub struct TreeSample<'a> {
    pub configurations: ArrayView2<'a, f64>,
    pub instances: Arc<Array2<f64>>,
    pub pairs: Vec<RunPair>,
    pub responses: Vec<f64>,
}

impl TreeSample<'_> {
    /// Number of selected runs (duplicates included).
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn n_config_features(&self) -> usize {
        self.configurations.ncols()
    }

    /// Design-matrix width.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.configurations.ncols() + self.instances.ncols()
    }

    /// Design-matrix value of `feature` for selected row `row`.
    #[inline]
    pub fn feature(&self, row: usize, feature: usize) -> f64 {
        let pair = self.pairs[row];
        let n_config = self.configurations.ncols();
        if feature < n_config {
            self.configurations[[pair.config, feature]]
        } else {
            self.instances[[pair.instance, feature - n_config]]
        }
    }
}

/// A single regression tree as seen by the ensemble.
///
/// Traversal methods take `&self` and must not mutate shared state, so one
/// forest can serve concurrent prediction calls.
pub trait TreeOracle: Sized + Send + Sync {
    /// Fit one tree. Given the same sample, config and generator state the
    /// result must be identical.
    fn fit<R: Rng + ?Sized>(sample: &TreeSample<'_>, config: &ForestConfig, rng: &mut R) -> Self;

    /// Number of nodes, leaves included.
    fn n_nodes(&self) -> usize;

    fn n_leaves(&self) -> usize;

    /// Leaf reached by each row of `rows` (design-matrix rows).
    fn forward_batch(&self, rows: ArrayView2<'_, f64>) -> Vec<NodeId>;

    /// Statistics stored at `leaf`.
    fn leaf_stats(&self, leaf: NodeId) -> LeafStats;

    /// Per-configuration statistics averaged over an instance population.
    ///
    /// `instances = None` uses the tree's own population: the one it was
    /// prepared with, or else its training instances.
    fn marginal_forward(
        &self,
        configurations: ArrayView2<'_, f64>,
        instances: Option<ArrayView2<'_, f64>>,
    ) -> Vec<LeafStats>;

    /// Discrete label per row.
    fn classify(&self, rows: ArrayView2<'_, f64>) -> Vec<f64>;

    /// Copy with cached per-node instance counts for `instances`.
    fn prepare_for_marginal(&self, instances: ArrayView2<'_, f64>) -> Self;

    /// Copy with cached leaf labels.
    fn prepare_for_classification(&self) -> Self;

    /// Check that traversal cannot index out of bounds for design rows of
    /// `n_config_features + n_instance_features` columns.
    fn validate(&self, n_config_features: usize, n_instance_features: usize) -> Result<(), TreeValidationError>;
}
