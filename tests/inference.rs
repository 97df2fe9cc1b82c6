//! Point, marginal and classification queries on fitted forests.

use std::num::NonZeroUsize;

use approx::assert_relative_eq;
use ndarray::{Array2, array, concatenate, Axis};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use surrogate_forest::inference::round_to_reference_precision;
use surrogate_forest::model::{DEFAULT_MIN_VARIANCE, TreeParams};
use surrogate_forest::testing::{FixedLeafTree, synthetic_training_data};
use surrogate_forest::{Forest, ForestConfig, ForestTrainer, LeafStats, RunPair, TrainingData};

fn fixed_forest(leaves: &[(f64, f64)], config: ForestConfig) -> Forest<FixedLeafTree> {
    let trees = leaves
        .iter()
        .map(|&(mean, variance)| FixedLeafTree::constant(LeafStats::new(mean, variance)))
        .collect();
    Forest::from_trees(trees, config, 1, 1).unwrap()
}

fn trained(log_model: bool, n_threads: usize) -> (Forest, TrainingData) {
    let data = synthetic_training_data(16, 6, 12);
    let config = ForestConfig::builder()
        .seed(31)
        .log_model(log_model)
        .n_threads(NonZeroUsize::new(n_threads).unwrap())
        .tree(TreeParams {
            split_min: 3,
            ..Default::default()
        })
        .build()
        .unwrap();
    let forest = ForestTrainer::new(config, 8).unwrap().learn_model(&data).unwrap();
    (forest, data)
}

// =============================================================================
// Aggregation arithmetic
// =============================================================================

#[test]
fn two_trees_mean_and_bessel_corrected_variance() {
    let forest = fixed_forest(&[(4.0, 1.0), (6.0, 1.0)], ForestConfig::default());
    let out = forest.apply(array![[0.0, 0.0]].view()).unwrap();
    assert_eq!(out.row(0), (5.0, 4.0));
}

#[test]
fn marginal_subset_uses_full_forest_size() {
    let forest = fixed_forest(&[(1.0, 0.2), (3.0, 0.5), (8.0, 0.1)], ForestConfig::default());
    let out = forest.apply_marginal(&[1], array![[0.0]].view(), None).unwrap();
    assert_eq!(out.row(0), (3.0, 0.75));
}

#[test]
fn single_tree_forest_reports_leaf_statistics() {
    let forest = fixed_forest(&[(2.0, 0.25)], ForestConfig::default());
    let out = forest.apply(array![[0.0, 0.0]].view()).unwrap();
    assert_eq!(out.row(0).0, 2.0);
    assert_relative_eq!(out.row(0).1, 0.25, epsilon = 1e-12);
}

#[test]
fn agreeing_trees_are_floored() {
    let config = ForestConfig::builder().min_variance(0.01).build().unwrap();
    let forest = fixed_forest(&[(3.0, 0.0), (3.0, 0.0), (3.0, 0.0)], config);
    let out = forest.apply(array![[0.0, 0.0]].view()).unwrap();
    assert_eq!(out.row(0), (3.0, 0.01));
}

proptest! {
    #[test]
    fn rounded_marginal_is_a_fixed_point(
        leaves in proptest::collection::vec((-1e3f64..1e3, 0.0f64..1e2), 1..6),
    ) {
        let forest = fixed_forest(&leaves, ForestConfig::default());
        let all: Vec<usize> = (0..leaves.len()).collect();
        let out = forest.apply_marginal_rounded(&all, array![[0.0]].view(), None).unwrap();
        let (mean, variance) = out.row(0);
        prop_assert_eq!(round_to_reference_precision(mean).to_bits(), mean.to_bits());
        prop_assert_eq!(round_to_reference_precision(variance).to_bits(), variance.to_bits());
    }

    #[test]
    fn ensemble_variance_never_drops_below_floor(
        leaves in proptest::collection::vec((-1e3f64..1e3, 0.0f64..1e2), 1..6),
    ) {
        let forest = fixed_forest(&leaves, ForestConfig::default());
        let out = forest.apply(array![[0.0, 0.0]].view()).unwrap();
        prop_assert!(out.row(0).1 >= DEFAULT_MIN_VARIANCE);
    }
}

// =============================================================================
// Trained forests
// =============================================================================

#[test]
fn thread_count_does_not_change_predictions() {
    let (one, data) = trained(false, 1);
    let (four, _) = trained(false, 4);
    let rows = data.design_matrix().unwrap();

    assert_eq!(one.apply(rows.view()).unwrap(), four.apply(rows.view()).unwrap());
    let all: Vec<usize> = (0..one.n_trees()).collect();
    assert_eq!(
        one.apply_marginal(&all, data.configurations.view(), None).unwrap(),
        four.apply_marginal(&all, data.configurations.view(), None).unwrap()
    );
}

#[test]
fn leaf_indices_cover_every_tree_and_row() {
    let (forest, data) = trained(false, 1);
    let rows = data.design_matrix().unwrap();
    let leaves = forest.leaf_indices(rows.view()).unwrap();
    assert_eq!(leaves.dim(), (forest.n_trees(), rows.nrows()));
    for (t, tree) in forest.trees().enumerate() {
        for &leaf in leaves.row(t) {
            assert!(tree.is_leaf(leaf));
        }
    }
}

#[test]
fn prepared_marginal_matches_traversal_bit_for_bit() {
    let (forest, data) = trained(false, 1);
    let all: Vec<usize> = (0..forest.n_trees()).collect();
    let queries = array![[0.1, 0.9], [0.5, 0.5], [0.95, 0.05]];

    let implicit = forest.apply_marginal(&all, queries.view(), None).unwrap();
    let explicit = forest
        .apply_marginal(&all, queries.view(), Some(data.instances.view()))
        .unwrap();
    let prepared = forest.prepare_for_marginal(data.instances.view()).unwrap();
    let cached = prepared.apply_marginal(&all, queries.view(), None).unwrap();

    assert_eq!(implicit, explicit);
    assert_eq!(implicit, cached);
    assert!(prepared.trees().all(|t| t.is_prepared_for_marginal()));
}

#[test]
fn prepared_population_replaces_training_instances() {
    let (forest, _) = trained(false, 1);
    let population = array![[0.0], [0.25], [1.0]];
    let subset = [0, 2, 5];

    let prepared = forest.prepare_for_marginal(population.view()).unwrap();
    let queries = array![[0.3, 0.3], [0.7, 0.2]];
    assert_eq!(
        prepared.apply_marginal(&subset, queries.view(), None).unwrap(),
        forest
            .apply_marginal(&subset, queries.view(), Some(population.view()))
            .unwrap()
    );
}

#[test]
fn marginal_over_one_instance_equals_point_prediction() {
    let (forest, _) = trained(false, 1);
    let all: Vec<usize> = (0..forest.n_trees()).collect();
    let configs = array![[0.2, 0.8], [0.6, 0.1]];
    let instance = array![[0.4]];

    let marginal = forest
        .apply_marginal(&all, configs.view(), Some(instance.view()))
        .unwrap();
    let column = Array2::from_elem((2, 1), 0.4);
    let rows = concatenate![Axis(1), configs, column];
    let point = forest.apply(rows.view()).unwrap();
    assert_eq!(marginal, point);
}

#[test]
fn log_model_marginals_are_log10_of_linear_marginals() {
    let (linear, data) = trained(false, 1);
    let (log, _) = trained(true, 1);
    let selection = [7, 0, 3];

    let lin = linear
        .marginal_tree_predictions(&selection, data.configurations.view(), None)
        .unwrap();
    let logged = log
        .marginal_tree_predictions(&selection, data.configurations.view(), None)
        .unwrap();
    assert_eq!(logged, lin.mapv(f64::log10));
}

#[test]
fn log_model_point_prediction_is_close_to_log10() {
    let (linear, data) = trained(false, 1);
    let (log, _) = trained(true, 1);
    let rows = data.design_matrix().unwrap();

    let lin = linear.apply(rows.view()).unwrap();
    let logged = log.apply(rows.view()).unwrap();
    for (l, g) in lin.mean().iter().zip(logged.mean()) {
        // Leaf spreads are small relative to responses >= 1.
        assert!((l.log10() - g).abs() < 0.25, "{l} vs {g}");
    }
}

#[test]
fn prepared_classification_matches_on_the_fly_labels() {
    let data = TrainingData::new(
        array![[0.0], [1.0], [2.0], [3.0]],
        array![[0.0]],
        (0..4).map(|c| RunPair::new(c, 0)).collect(),
        array![1.0, 1.0, 2.0, 3.0],
        vec![],
    )
    .unwrap();
    let forest: Forest = ForestTrainer::deterministic(vec![]).learn_model(&data).unwrap();
    let prepared = forest.prepare_for_classification();
    let rows = data.design_matrix().unwrap();

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let labels = forest.classify(rows.view(), &mut rng).unwrap();
    let cached = prepared.classify(rows.view(), &mut rng).unwrap();
    assert_eq!(labels, vec![1.0, 1.0, 2.0, 3.0]);
    assert_eq!(labels, cached);
}
