//! Reference regression tree (SoA) and its construction API.
//!
//! This module provides:
//! - [`RegressionTree`]: immutable SoA storage implementing [`TreeOracle`]
//! - [`TreeBuilder`]: node-by-node construction used by the grower
//!
//! Features `0..n_config_features` are configuration columns; the remaining
//! features are instance columns. Marginal prediction relies on that split.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::oracle::{LeafStats, NodeId, TreeOracle, TreeSample, TreeValidationError};
use crate::model::ForestConfig;
use crate::training::TreeGrower;

// ============================================================================
// SplitKind
// ============================================================================

/// How a split node compares a feature value against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitKind {
    /// `value <= threshold` goes left.
    Numeric,
    /// `value == threshold` (a category code) goes left.
    Categorical,
}

impl SplitKind {
    #[inline]
    pub fn goes_left(self, value: f64, threshold: f64) -> bool {
        match self {
            SplitKind::Numeric => value <= threshold,
            SplitKind::Categorical => value == threshold,
        }
    }
}

// ============================================================================
// RegressionTree
// ============================================================================

/// Per-node instance counts for one instance population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MarginalCache {
    node_counts: Box<[u64]>,
    n_instances: u64,
}

/// Structure-of-Arrays regression tree.
///
/// Child indices are local to this tree (0 = root). Every leaf keeps its
/// training responses so labels can be derived for classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    split_features: Box<[u32]>,
    thresholds: Box<[f64]>,
    split_kinds: Box<[SplitKind]>,
    left_children: Box<[NodeId]>,
    right_children: Box<[NodeId]>,
    is_leaf: Box<[bool]>,
    leaf_stats: Box<[LeafStats]>,
    /// `responses[offsets[n]..offsets[n + 1]]` are the responses of node `n`.
    response_offsets: Box<[u32]>,
    responses: Box<[f64]>,
    n_config_features: u32,
    training_instances: Arc<Array2<f64>>,
    marginal_cache: Option<MarginalCache>,
    leaf_labels: Option<Box<[f64]>>,
}

impl RegressionTree {
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&leaf| leaf).count()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn split_feature(&self, node: NodeId) -> u32 {
        self.split_features[node as usize]
    }

    #[inline]
    pub fn threshold(&self, node: NodeId) -> f64 {
        self.thresholds[node as usize]
    }

    #[inline]
    pub fn split_kind(&self, node: NodeId) -> SplitKind {
        self.split_kinds[node as usize]
    }

    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    /// Training responses that ended in `node` (empty for split nodes).
    #[inline]
    pub fn leaf_responses(&self, node: NodeId) -> &[f64] {
        let n = node as usize;
        let start = self.response_offsets[n] as usize;
        let end = self.response_offsets[n + 1] as usize;
        &self.responses[start..end]
    }

    #[inline]
    pub fn n_config_features(&self) -> usize {
        self.n_config_features as usize
    }

    /// Instance population the tree was trained against, shared with the
    /// other trees of its forest.
    pub fn training_instances(&self) -> &Arc<Array2<f64>> {
        &self.training_instances
    }

    #[inline]
    pub fn is_prepared_for_marginal(&self) -> bool {
        self.marginal_cache.is_some()
    }

    #[inline]
    pub fn is_prepared_for_classification(&self) -> bool {
        self.leaf_labels.is_some()
    }

    /// Walk from the root using `value(feature)` for split decisions.
    #[inline]
    fn descend(&self, value: impl Fn(usize) -> f64) -> NodeId {
        let mut node: NodeId = 0;
        while !self.is_leaf(node) {
            let idx = node as usize;
            let v = value(self.split_features[idx] as usize);
            node = if self.split_kinds[idx].goes_left(v, self.thresholds[idx]) {
                self.left_children[idx]
            } else {
                self.right_children[idx]
            };
        }
        node
    }

    /// Leaf reached by one design-matrix row.
    #[inline]
    pub fn leaf_for_row(&self, row: ArrayView1<'_, f64>) -> NodeId {
        self.descend(|f| row[f])
    }

    fn weighted_stats(&self, reached: impl Iterator<Item = (NodeId, u64)>, n_instances: u64) -> LeafStats {
        let mut mean = 0.0;
        let mut variance = 0.0;
        for (leaf, count) in reached {
            let stats = self.leaf_stats[leaf as usize];
            let weight = count as f64;
            mean += weight * stats.mean;
            variance += weight * stats.variance;
        }
        let n = n_instances as f64;
        LeafStats::new(mean / n, variance / n)
    }

    /// Marginal statistics of one configuration by full traversal of every
    /// (configuration, instance) combination.
    fn marginal_by_traversal(&self, config: ArrayView1<'_, f64>, instances: ArrayView2<'_, f64>) -> LeafStats {
        let k = self.n_config_features();
        let mut counts = vec![0u64; self.n_nodes()];
        for instance in instances.rows() {
            let leaf = self.descend(|f| if f < k { config[f] } else { instance[f - k] });
            counts[leaf as usize] += 1;
        }
        let reached = counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(node, &c)| (node as NodeId, c));
        self.weighted_stats(reached, instances.nrows() as u64)
    }

    /// Marginal statistics of one configuration from cached instance counts.
    ///
    /// Configuration splits are followed; instance splits fan out to both
    /// children. Leaves are summed in index order, which makes the result
    /// identical to [`Self::marginal_by_traversal`] over the cached population.
    fn marginal_from_cache(&self, config: ArrayView1<'_, f64>, cache: &MarginalCache) -> LeafStats {
        let k = self.n_config_features();
        let mut reached = Vec::new();
        let mut stack: Vec<NodeId> = vec![0];

        while let Some(node) = stack.pop() {
            let idx = node as usize;
            let count = cache.node_counts[idx];
            if count == 0 {
                continue;
            }
            if self.is_leaf[idx] {
                reached.push((node, count));
                continue;
            }
            let feature = self.split_features[idx] as usize;
            if feature < k {
                let next = if self.split_kinds[idx].goes_left(config[feature], self.thresholds[idx]) {
                    self.left_children[idx]
                } else {
                    self.right_children[idx]
                };
                stack.push(next);
            } else {
                stack.push(self.right_children[idx]);
                stack.push(self.left_children[idx]);
            }
        }

        reached.sort_unstable_by_key(|&(node, _)| node);
        self.weighted_stats(reached.into_iter(), cache.n_instances)
    }

    fn build_marginal_cache(&self, instances: ArrayView2<'_, f64>) -> MarginalCache {
        let k = self.n_config_features();
        let mut node_counts = vec![0u64; self.n_nodes()];
        let mut stack: Vec<(NodeId, Vec<usize>)> = vec![(0, (0..instances.nrows()).collect())];

        while let Some((node, rows)) = stack.pop() {
            let idx = node as usize;
            node_counts[idx] = rows.len() as u64;
            if self.is_leaf[idx] || rows.is_empty() {
                continue;
            }
            let feature = self.split_features[idx] as usize;
            let (left, right): (Vec<usize>, Vec<usize>) = if feature < k {
                (rows.clone(), rows)
            } else {
                let kind = self.split_kinds[idx];
                let threshold = self.thresholds[idx];
                rows.into_iter()
                    .partition(|&r| kind.goes_left(instances[[r, feature - k]], threshold))
            };
            stack.push((self.left_children[idx], left));
            stack.push((self.right_children[idx], right));
        }

        MarginalCache {
            node_counts: node_counts.into_boxed_slice(),
            n_instances: instances.nrows() as u64,
        }
    }

    /// Check structural invariants for rows of
    /// `n_config_features + n_instance_features` columns.
    ///
    /// Trees built by [`TreeBuilder`] always pass.
    pub fn validate(&self, n_config_features: usize, n_instance_features: usize) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        let per_node = [
            ("split_features", self.split_features.len(), n_nodes),
            ("thresholds", self.thresholds.len(), n_nodes),
            ("split_kinds", self.split_kinds.len(), n_nodes),
            ("left_children", self.left_children.len(), n_nodes),
            ("right_children", self.right_children.len(), n_nodes),
            ("leaf_stats", self.leaf_stats.len(), n_nodes),
            ("response_offsets", self.response_offsets.len(), n_nodes + 1),
        ];
        for (field, len, expected) in per_node {
            if len != expected {
                return Err(TreeValidationError::LenMismatch { field, len, expected });
            }
        }
        if let Some(cache) = &self.marginal_cache {
            if cache.node_counts.len() != n_nodes {
                return Err(TreeValidationError::LenMismatch {
                    field: "marginal cache",
                    len: cache.node_counts.len(),
                    expected: n_nodes,
                });
            }
        }
        if let Some(labels) = &self.leaf_labels {
            if labels.len() != n_nodes {
                return Err(TreeValidationError::LenMismatch {
                    field: "leaf_labels",
                    len: labels.len(),
                    expected: n_nodes,
                });
            }
        }

        if self.n_config_features() != n_config_features {
            return Err(TreeValidationError::WidthMismatch {
                what: "configuration width",
                expected: n_config_features,
                got: self.n_config_features(),
            });
        }
        if self.training_instances.ncols() != n_instance_features {
            return Err(TreeValidationError::WidthMismatch {
                what: "training instance width",
                expected: n_instance_features,
                got: self.training_instances.ncols(),
            });
        }

        if self.response_offsets[0] != 0 {
            return Err(TreeValidationError::BadResponseOffsets { node: 0 });
        }
        for node in 0..n_nodes {
            let (start, end) = (self.response_offsets[node], self.response_offsets[node + 1]);
            if start > end || end as usize > self.responses.len() {
                return Err(TreeValidationError::BadResponseOffsets { node: node as NodeId });
            }
        }

        let n_features = n_config_features + n_instance_features;
        // 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(NodeId, bool)> = vec![(0, false)];

        while let Some((node, finished)) = stack.pop() {
            let idx = node as usize;
            if finished {
                color[idx] = 2;
                continue;
            }
            match color[idx] {
                1 => return Err(TreeValidationError::CycleDetected { node }),
                2 => return Err(TreeValidationError::DuplicateVisit { node }),
                _ => {}
            }
            color[idx] = 1;
            stack.push((node, true));
            if self.is_leaf(node) {
                continue;
            }

            let feature = self.split_features[idx] as usize;
            if feature >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange { node, feature, n_features });
            }
            let (left, right) = (self.left_children[idx], self.right_children[idx]);
            if left == node || right == node {
                return Err(TreeValidationError::SelfLoop { node });
            }
            for (side, child) in [("left", left), ("right", right)] {
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds { node, side, child, n_nodes });
                }
            }
            stack.push((right, false));
            stack.push((left, false));
        }

        if let Some(node) = color.iter().position(|&c| c == 0) {
            return Err(TreeValidationError::UnreachableNode { node: node as NodeId });
        }
        Ok(())
    }

    fn label_of(&self, leaf: NodeId) -> f64 {
        match &self.leaf_labels {
            Some(labels) => labels[leaf as usize],
            None => modal_label(self.leaf_responses(leaf)),
        }
    }
}

/// Most frequent value; ties go to the smallest value. NaN for no values.
fn modal_label(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let mut best = f64::NAN;
    let mut best_count = 0;
    for run in sorted.chunk_by(|a, b| a.to_bits() == b.to_bits()) {
        if run.len() > best_count {
            best = run[0];
            best_count = run.len();
        }
    }
    best
}

impl TreeOracle for RegressionTree {
    fn fit<R: Rng + ?Sized>(sample: &TreeSample<'_>, config: &ForestConfig, rng: &mut R) -> Self {
        TreeGrower::new(sample, config).grow(rng)
    }

    fn n_nodes(&self) -> usize {
        RegressionTree::n_nodes(self)
    }

    fn n_leaves(&self) -> usize {
        RegressionTree::n_leaves(self)
    }

    fn forward_batch(&self, rows: ArrayView2<'_, f64>) -> Vec<NodeId> {
        rows.rows().into_iter().map(|row| self.leaf_for_row(row)).collect()
    }

    #[inline]
    fn leaf_stats(&self, leaf: NodeId) -> LeafStats {
        self.leaf_stats[leaf as usize]
    }

    fn marginal_forward(
        &self,
        configurations: ArrayView2<'_, f64>,
        instances: Option<ArrayView2<'_, f64>>,
    ) -> Vec<LeafStats> {
        configurations
            .rows()
            .into_iter()
            .map(|config| match (instances, &self.marginal_cache) {
                (Some(population), _) => self.marginal_by_traversal(config, population),
                (None, Some(cache)) => self.marginal_from_cache(config, cache),
                (None, None) => self.marginal_by_traversal(config, self.training_instances.view()),
            })
            .collect()
    }

    fn classify(&self, rows: ArrayView2<'_, f64>) -> Vec<f64> {
        rows.rows()
            .into_iter()
            .map(|row| self.label_of(self.leaf_for_row(row)))
            .collect()
    }

    fn prepare_for_marginal(&self, instances: ArrayView2<'_, f64>) -> Self {
        Self {
            marginal_cache: Some(self.build_marginal_cache(instances)),
            ..self.clone()
        }
    }

    fn validate(&self, n_config_features: usize, n_instance_features: usize) -> Result<(), TreeValidationError> {
        RegressionTree::validate(self, n_config_features, n_instance_features)
    }

    fn prepare_for_classification(&self) -> Self {
        let labels: Vec<f64> = (0..self.n_nodes() as NodeId)
            .map(|node| {
                if self.is_leaf(node) {
                    modal_label(self.leaf_responses(node))
                } else {
                    f64::NAN
                }
            })
            .collect();
        Self {
            leaf_labels: Some(labels.into_boxed_slice()),
            ..self.clone()
        }
    }
}

/// Structural hash: split layout, leaf statistics and stored responses.
///
/// Floats are hashed by bit pattern. The training instance matrix and any
/// preparation caches are not part of the hash.
impl Hash for RegressionTree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.split_features.hash(state);
        for t in self.thresholds.iter() {
            t.to_bits().hash(state);
        }
        self.split_kinds.hash(state);
        self.left_children.hash(state);
        self.right_children.hash(state);
        self.is_leaf.hash(state);
        for s in self.leaf_stats.iter() {
            s.mean.to_bits().hash(state);
            s.variance.to_bits().hash(state);
        }
        self.response_offsets.hash(state);
        for r in self.responses.iter() {
            r.to_bits().hash(state);
        }
        self.n_config_features.hash(state);
    }
}

// =============================================================================
// TreeBuilder (training-time construction)
// =============================================================================

/// Mutable tree used while growing.
///
/// Nodes are allocated as placeholders and filled in once their split or
/// leaf responses are known.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    split_features: Vec<u32>,
    thresholds: Vec<f64>,
    split_kinds: Vec<SplitKind>,
    left_children: Vec<NodeId>,
    right_children: Vec<NodeId>,
    is_leaf: Vec<bool>,
    leaf_responses: Vec<Vec<f64>>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset and allocate the root placeholder. Returns the root id (0).
    pub fn init_root(&mut self) -> NodeId {
        *self = Self::default();
        self.allocate_node()
    }

    fn allocate_node(&mut self) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.split_features.push(0);
        self.thresholds.push(0.0);
        self.split_kinds.push(SplitKind::Numeric);
        self.left_children.push(0);
        self.right_children.push(0);
        self.is_leaf.push(true);
        self.leaf_responses.push(Vec::new());
        id
    }

    /// Turn `node` into a split, allocating its children.
    ///
    /// Returns `(left_id, right_id)`.
    pub fn apply_split(&mut self, node: NodeId, feature: u32, threshold: f64, kind: SplitKind) -> (NodeId, NodeId) {
        let left = self.allocate_node();
        let right = self.allocate_node();

        let idx = node as usize;
        self.split_features[idx] = feature;
        self.thresholds[idx] = threshold;
        self.split_kinds[idx] = kind;
        self.left_children[idx] = left;
        self.right_children[idx] = right;
        self.is_leaf[idx] = false;

        (left, right)
    }

    /// Mark `node` as a leaf holding `responses`.
    pub fn make_leaf(&mut self, node: NodeId, responses: Vec<f64>) {
        let idx = node as usize;
        self.is_leaf[idx] = true;
        self.leaf_responses[idx] = responses;
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Finalize into immutable storage.
    pub fn freeze(self, n_config_features: usize, training_instances: Arc<Array2<f64>>) -> RegressionTree {
        let n_nodes = self.n_nodes();
        let mut response_offsets = Vec::with_capacity(n_nodes + 1);
        let mut responses = Vec::new();
        let mut leaf_stats = Vec::with_capacity(n_nodes);

        response_offsets.push(0u32);
        for (leaf, values) in self.is_leaf.iter().zip(self.leaf_responses) {
            if *leaf {
                leaf_stats.push(summarize(&values));
                responses.extend_from_slice(&values);
            } else {
                leaf_stats.push(LeafStats::default());
            }
            response_offsets.push(responses.len() as u32);
        }

        RegressionTree {
            split_features: self.split_features.into_boxed_slice(),
            thresholds: self.thresholds.into_boxed_slice(),
            split_kinds: self.split_kinds.into_boxed_slice(),
            left_children: self.left_children.into_boxed_slice(),
            right_children: self.right_children.into_boxed_slice(),
            is_leaf: self.is_leaf.into_boxed_slice(),
            leaf_stats: leaf_stats.into_boxed_slice(),
            response_offsets: response_offsets.into_boxed_slice(),
            responses: responses.into_boxed_slice(),
            n_config_features: n_config_features as u32,
            training_instances,
            marginal_cache: None,
            leaf_labels: None,
        }
    }
}

/// Mean and population variance. NaN for an empty leaf.
fn summarize(values: &[f64]) -> LeafStats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    LeafStats::new(mean, variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// config feature 0 <= 0.5 ? (instance feature 1 == 2 ? A : B) : C
    fn mixed_tree() -> RegressionTree {
        let mut b = TreeBuilder::new();
        let root = b.init_root();
        let (left, right) = b.apply_split(root, 0, 0.5, SplitKind::Numeric);
        let (ll, lr) = b.apply_split(left, 1, 2.0, SplitKind::Categorical);
        b.make_leaf(ll, vec![1.0, 3.0]);
        b.make_leaf(lr, vec![10.0]);
        b.make_leaf(right, vec![4.0, 4.0, 7.0]);
        b.freeze(1, Arc::new(array![[2.0], [1.0], [2.0], [0.0]]))
    }

    #[test]
    fn leaf_statistics_use_population_variance() {
        let tree = mixed_tree();
        let leaf = tree.forward_batch(array![[0.1, 2.0]].view())[0];
        assert_eq!(tree.leaf_stats(leaf), LeafStats::new(2.0, 1.0));
        assert_eq!(tree.leaf_responses(leaf), &[1.0, 3.0]);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.n_nodes(), 5);
    }

    #[test]
    fn numeric_threshold_is_inclusive() {
        let tree = mixed_tree();
        let leaves = tree.forward_batch(array![[0.5, 1.0], [0.6, 1.0]].view());
        assert_eq!(tree.leaf_stats(leaves[0]).mean, 10.0);
        assert_eq!(tree.leaf_stats(leaves[1]).mean, 5.0);
    }

    #[test]
    fn marginal_over_training_instances() {
        let tree = mixed_tree();
        let stats = tree.marginal_forward(array![[0.0], [1.0]].view(), None);
        // Instances {2, 1, 2, 0}: two reach A (2, 1), two reach B (10, 0).
        assert_relative_eq!(stats[0].mean, 6.0);
        assert_relative_eq!(stats[0].variance, 0.5);
        assert_relative_eq!(stats[1].mean, 5.0);
        assert_relative_eq!(stats[1].variance, 2.0);
    }

    #[test]
    fn prepared_marginal_matches_traversal_bitwise() {
        let tree = mixed_tree();
        let population = array![[2.0], [5.0], [2.0], [2.0], [7.0]];
        let configs = array![[0.0], [0.5], [0.9]];

        let direct = tree.marginal_forward(configs.view(), Some(population.view()));
        let prepared = tree.prepare_for_marginal(population.view());
        assert!(prepared.is_prepared_for_marginal());
        let cached = prepared.marginal_forward(configs.view(), None);

        for (a, b) in direct.iter().zip(&cached) {
            assert_eq!(a.mean.to_bits(), b.mean.to_bits());
            assert_eq!(a.variance.to_bits(), b.variance.to_bits());
        }
    }

    #[test]
    fn classify_picks_modal_label() {
        let tree = mixed_tree();
        let rows = array![[0.1, 2.0], [0.9, 0.0]];
        let labels = tree.classify(rows.view());
        // Tie between 1 and 3 goes to 1.
        assert_eq!(labels, vec![1.0, 4.0]);

        let prepared = tree.prepare_for_classification();
        assert!(prepared.is_prepared_for_classification());
        assert_eq!(prepared.classify(rows.view()), labels);
    }

    #[test]
    fn modal_label_edge_cases() {
        assert!(modal_label(&[]).is_nan());
        assert_eq!(modal_label(&[2.0, 1.0, 2.0, 1.0, 3.0]), 1.0);
        assert_eq!(modal_label(&[5.0]), 5.0);
    }

    #[test]
    fn hash_ignores_preparation() {
        use std::collections::hash_map::DefaultHasher;

        let hash = |t: &RegressionTree| {
            let mut h = DefaultHasher::new();
            t.hash(&mut h);
            h.finish()
        };
        let tree = mixed_tree();
        let prepared = tree.prepare_for_classification();
        assert_eq!(hash(&tree), hash(&prepared));
        assert_ne!(tree, prepared);
    }

    #[test]
    fn built_trees_validate() {
        let tree = mixed_tree();
        assert_eq!(tree.validate(1, 1), Ok(()));
        let prepared = tree.prepare_for_marginal(array![[2.0], [5.0]].view()).prepare_for_classification();
        assert_eq!(prepared.validate(1, 1), Ok(()));
    }

    #[test]
    fn validate_rejects_wrong_widths() {
        assert_eq!(
            mixed_tree().validate(1, 2),
            Err(TreeValidationError::WidthMismatch {
                what: "training instance width",
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            mixed_tree().validate(2, 1),
            Err(TreeValidationError::WidthMismatch {
                what: "configuration width",
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn validate_rejects_broken_structure() {
        let mut tree = mixed_tree();
        tree.split_features[0] = 5;
        assert_eq!(
            tree.validate(1, 1),
            Err(TreeValidationError::FeatureOutOfRange {
                node: 0,
                feature: 5,
                n_features: 2
            })
        );

        let mut tree = mixed_tree();
        tree.left_children[1] = 0;
        assert_eq!(tree.validate(1, 1), Err(TreeValidationError::CycleDetected { node: 0 }));

        let mut tree = mixed_tree();
        tree.right_children[1] = 42;
        assert_eq!(
            tree.validate(1, 1),
            Err(TreeValidationError::ChildOutOfBounds {
                node: 1,
                side: "right",
                child: 42,
                n_nodes: 5
            })
        );

        let mut tree = mixed_tree();
        tree.is_leaf[1] = true;
        assert_eq!(tree.validate(1, 1), Err(TreeValidationError::UnreachableNode { node: 3 }));

        let mut tree = mixed_tree();
        let last = tree.response_offsets.len() - 1;
        tree.response_offsets[last] = 99;
        assert_eq!(tree.validate(1, 1), Err(TreeValidationError::BadResponseOffsets { node: 4 }));
    }
}
