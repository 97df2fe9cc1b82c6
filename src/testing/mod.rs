//! Test fixtures: synthetic data sets and a tree with fixed leaves.
//!
//! Used by the crate's own tests and benches. Everything here is seeded,
//! so fixtures are identical on every run.

use std::hash::{Hash, Hasher};

use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{RunPair, TrainingData};
use crate::model::ForestConfig;
use crate::repr::{LeafStats, NodeId, TreeOracle, TreeSample, TreeValidationError};

// =============================================================================
// Synthetic data
// =============================================================================

/// `rows x cols` matrix of uniform draws from `[0, 1)`.
pub fn random_matrix<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| rng.random::<f64>())
}

/// Smooth positive response over two configuration features and one
/// instance feature, evaluated on every (configuration, instance) pair.
///
/// `y = 1 + 4 c0 + 2 c1^2 + x0 + noise`, noise uniform in `[0, 0.1)`.
/// Responses are strictly positive so the set also suits log models.
pub fn synthetic_training_data(n_configurations: usize, n_instances: usize, seed: u64) -> TrainingData {
    let mut rng = StdRng::seed_from_u64(seed);
    let configurations = random_matrix(n_configurations, 2, &mut rng);
    let instances = random_matrix(n_instances, 1, &mut rng);

    let mut pairs = Vec::with_capacity(n_configurations * n_instances);
    let mut responses = Vec::with_capacity(n_configurations * n_instances);
    for c in 0..n_configurations {
        for i in 0..n_instances {
            let (c0, c1, x0) = (configurations[[c, 0]], configurations[[c, 1]], instances[[i, 0]]);
            pairs.push(RunPair::new(c, i));
            responses.push(1.0 + 4.0 * c0 + 2.0 * c1 * c1 + x0 + 0.1 * rng.random::<f64>());
        }
    }

    TrainingData {
        configurations,
        instances,
        pairs,
        responses: Array1::from(responses),
        cat_domain_sizes: vec![],
    }
}

/// Like [`synthetic_training_data`], but configuration column 0 holds a
/// category code in `0..n_categories` that shifts the response by
/// `10 * code`.
pub fn synthetic_categorical_data(
    n_configurations: usize,
    n_instances: usize,
    n_categories: u32,
    seed: u64,
) -> TrainingData {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut configurations = random_matrix(n_configurations, 2, &mut rng);
    for c in 0..n_configurations {
        configurations[[c, 0]] = f64::from(rng.random_range(0..n_categories.max(1)));
    }
    let instances = random_matrix(n_instances, 1, &mut rng);

    let mut pairs = Vec::with_capacity(n_configurations * n_instances);
    let mut responses = Vec::with_capacity(n_configurations * n_instances);
    for c in 0..n_configurations {
        for i in 0..n_instances {
            pairs.push(RunPair::new(c, i));
            responses.push(1.0 + 10.0 * configurations[[c, 0]] + configurations[[c, 1]] + instances[[i, 0]]);
        }
    }

    TrainingData {
        configurations,
        instances,
        pairs,
        responses: Array1::from(responses),
        cat_domain_sizes: vec![n_categories, 0, 0],
    }
}

// =============================================================================
// FixedLeafTree
// =============================================================================

/// Tree whose leaves carry caller-chosen statistics.
///
/// Row `r` lands in leaf `floor(r[0])`, clamped to the valid range, so tests
/// steer rows through the first column. Fitting yields a single leaf holding
/// the sample mean and population variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedLeafTree {
    leaves: Vec<LeafStats>,
}

impl FixedLeafTree {
    /// # Panics
    ///
    /// Panics if `leaves` is empty.
    pub fn new(leaves: Vec<LeafStats>) -> Self {
        assert!(!leaves.is_empty(), "a tree needs at least one leaf");
        Self { leaves }
    }

    pub fn constant(stats: LeafStats) -> Self {
        Self { leaves: vec![stats] }
    }

    #[inline]
    pub fn leaf(&self, idx: usize) -> LeafStats {
        self.leaves[idx]
    }

    fn route(&self, key: f64) -> NodeId {
        let last = self.leaves.len() - 1;
        if last == 0 || key.is_nan() || key <= 0.0 {
            return 0;
        }
        (key.floor() as usize).min(last) as NodeId
    }
}

impl Hash for FixedLeafTree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for leaf in &self.leaves {
            leaf.mean.to_bits().hash(state);
            leaf.variance.to_bits().hash(state);
        }
    }
}

impl TreeOracle for FixedLeafTree {
    fn fit<R: Rng + ?Sized>(sample: &TreeSample<'_>, _config: &ForestConfig, _rng: &mut R) -> Self {
        let n = sample.responses.len() as f64;
        let mean = sample.responses.iter().sum::<f64>() / n;
        let variance = sample.responses.iter().map(|y| (y - mean) * (y - mean)).sum::<f64>() / n;
        Self::constant(LeafStats::new(mean, variance))
    }

    fn n_nodes(&self) -> usize {
        self.leaves.len()
    }

    fn n_leaves(&self) -> usize {
        self.leaves.len()
    }

    fn forward_batch(&self, rows: ArrayView2<'_, f64>) -> Vec<NodeId> {
        rows.rows().into_iter().map(|row| self.route(row[0])).collect()
    }

    fn leaf_stats(&self, leaf: NodeId) -> LeafStats {
        self.leaves[leaf as usize]
    }

    fn marginal_forward(
        &self,
        configurations: ArrayView2<'_, f64>,
        _instances: Option<ArrayView2<'_, f64>>,
    ) -> Vec<LeafStats> {
        configurations
            .rows()
            .into_iter()
            .map(|row| self.leaves[self.route(row[0]) as usize])
            .collect()
    }

    fn classify(&self, rows: ArrayView2<'_, f64>) -> Vec<f64> {
        self.forward_batch(rows)
            .into_iter()
            .map(|leaf| self.leaves[leaf as usize].mean)
            .collect()
    }

    fn prepare_for_marginal(&self, _instances: ArrayView2<'_, f64>) -> Self {
        self.clone()
    }

    fn prepare_for_classification(&self) -> Self {
        self.clone()
    }

    /// Routing reads column 0 of configuration rows.
    fn validate(&self, n_config_features: usize, _n_instance_features: usize) -> Result<(), TreeValidationError> {
        if self.leaves.is_empty() {
            return Err(TreeValidationError::EmptyTree);
        }
        if n_config_features == 0 {
            return Err(TreeValidationError::WidthMismatch {
                what: "configuration width",
                expected: 1,
                got: 0,
            });
        }
        Ok(())
    }
}
