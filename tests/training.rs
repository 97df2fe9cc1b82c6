//! Forest training integration tests.
//!
//! Focused on reproducibility and on what the fitted trees learn.

use std::io::Write;

use approx::assert_relative_eq;
use ndarray::array;
use surrogate_forest::data::CsvColumns;
use surrogate_forest::model::{DEFAULT_MIN_VARIANCE, TreeParams};
use surrogate_forest::testing::{synthetic_categorical_data, synthetic_training_data};
use surrogate_forest::training::BootstrapAssignment;
use surrogate_forest::{Forest, ForestConfig, ForestError, ForestTrainer, RegressionTree};

fn seeded_config(seed: u64) -> ForestConfig {
    ForestConfig::builder()
        .seed(seed)
        .tree(TreeParams {
            split_min: 2,
            ..Default::default()
        })
        .build()
        .unwrap()
}

#[test]
fn same_seed_same_forest_and_predictions() {
    let data = synthetic_training_data(15, 5, 1);
    let rows = data.design_matrix().unwrap();

    let a: Forest = ForestTrainer::new(seeded_config(42), 10).unwrap().learn_model(&data).unwrap();
    let b: Forest = ForestTrainer::new(seeded_config(42), 10).unwrap().learn_model(&data).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.apply(rows.view()).unwrap(), b.apply(rows.view()).unwrap());
}

#[test]
fn different_seeds_give_different_bootstraps() {
    let data = synthetic_training_data(15, 5, 1);
    let a: Forest = ForestTrainer::new(seeded_config(1), 10).unwrap().learn_model(&data).unwrap();
    let b: Forest = ForestTrainer::new(seeded_config(2), 10).unwrap().learn_model(&data).unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn without_bootstrap_or_feature_sampling_trees_are_identical() {
    let data = synthetic_training_data(10, 3, 4);
    let config = |seed| {
        ForestConfig::builder()
            .seed(seed)
            .do_bootstrapping(false)
            .tree(TreeParams {
                split_min: 2,
                ratio_features: 1.0,
                max_depth: None,
            })
            .build()
            .unwrap()
    };

    let a: Forest = ForestTrainer::new(config(1), 4).unwrap().learn_model(&data).unwrap();
    let b: Forest = ForestTrainer::new(config(99), 4).unwrap().learn_model(&data).unwrap();
    assert_eq!(a, b);
    for tree in a.trees() {
        assert_eq!(tree, a.tree(0));
    }
}

#[test]
fn deterministic_tree_reproduces_training_responses() {
    let data = synthetic_training_data(8, 4, 7);
    let forest: Forest = ForestTrainer::deterministic(vec![]).learn_model(&data).unwrap();
    assert_eq!(forest.n_trees(), 1);

    let out = forest.apply(data.design_matrix().unwrap().view()).unwrap();
    for (row, (mean, variance)) in out.rows().enumerate() {
        assert_relative_eq!(mean, data.responses[row], max_relative = 1e-12);
        assert_eq!(variance, DEFAULT_MIN_VARIANCE);
    }
}

#[test]
fn forest_beats_the_global_mean() {
    let train = synthetic_training_data(40, 5, 10);
    let test = synthetic_training_data(20, 5, 11);
    let forest: Forest = ForestTrainer::new(seeded_config(3), 20).unwrap().learn_model(&train).unwrap();

    let global_mean = train.responses.mean().unwrap();
    let out = forest.apply(test.design_matrix().unwrap().view()).unwrap();

    let forest_sse: f64 = out.mean().iter().zip(&test.responses).map(|(p, y)| (p - y).powi(2)).sum();
    let baseline_sse: f64 = test.responses.iter().map(|y| (global_mean - y).powi(2)).sum();
    assert!(
        forest_sse < 0.5 * baseline_sse,
        "forest SSE {forest_sse} should be well below baseline {baseline_sse}"
    );
}

#[test]
fn categorical_codes_are_separated() {
    let data = synthetic_categorical_data(30, 3, 3, 5);
    let forest: Forest = ForestTrainer::new(seeded_config(8), 10).unwrap().learn_model(&data).unwrap();
    assert_eq!(forest.config().cat_domain_sizes, vec![3, 0, 0]);

    // The category shifts the response by 10 per code; everything else stays below 3.
    let rows = array![[0.0, 0.5, 0.5], [1.0, 0.5, 0.5], [2.0, 0.5, 0.5]];
    let out = forest.apply(rows.view()).unwrap();
    assert!(out.mean()[0] < out.mean()[1]);
    assert!(out.mean()[1] < out.mean()[2]);
    assert!(out.mean()[2] - out.mean()[0] > 10.0);
}

#[test]
fn max_depth_limits_tree_size() {
    let data = synthetic_training_data(20, 4, 2);
    let config = ForestConfig::builder()
        .seed(1)
        .tree(TreeParams {
            split_min: 1,
            ratio_features: 1.0,
            max_depth: Some(2),
        })
        .build()
        .unwrap();
    let forest: Forest = ForestTrainer::new(config, 3).unwrap().learn_model(&data).unwrap();
    for tree in forest.trees() {
        assert!(tree.n_leaves() <= 4);
        assert!(tree.n_nodes() <= 7);
    }
}

#[test]
fn explicit_assignment_overrides_sampling() {
    let data = synthetic_training_data(6, 2, 3);
    let n = data.n_runs();
    let trainer = ForestTrainer::new(seeded_config(0), 2).unwrap();

    let identity = BootstrapAssignment::identity(2, n);
    let forest: Forest = trainer.learn_model_with_assignment(&data, &identity).unwrap();
    assert_eq!(forest.tree(0), forest.tree(1));

    let short = BootstrapAssignment::identity(1, n);
    let err = trainer
        .learn_model_with_assignment::<RegressionTree>(&data, &short)
        .unwrap_err();
    assert_eq!(err, ForestError::AssignmentLenMismatch { expected: 2, got: 1 });
}

#[test]
fn imputed_responses_drive_each_tree() {
    let data = synthetic_training_data(5, 2, 6);
    let n = data.n_runs();
    let mut imputed = ndarray::Array2::<f64>::zeros((2, n));
    imputed.row_mut(0).fill(1.0);
    imputed.row_mut(1).fill(9.0);

    let config = ForestConfig::builder().seed(2).do_bootstrapping(false).build().unwrap();
    let forest: Forest = ForestTrainer::new(config, 2)
        .unwrap()
        .learn_model_imputed(&data, imputed.view())
        .unwrap();

    let rows = data.design_matrix().unwrap();
    let leaves = forest.leaf_indices(rows.view()).unwrap();
    for r in 0..n {
        assert!(forest.tree(0).leaf_responses(leaves[[0, r]]).iter().all(|&y| y == 1.0));
        assert!(forest.tree(1).leaf_responses(leaves[[1, r]]).iter().all(|&y| y == 9.0));
    }
}

#[test]
fn csv_run_table_trains_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "alpha,solver,instance_size,runtime").unwrap();
    for (alpha, solver, size) in [
        (0.1, 0_u32, 10.0),
        (0.1, 0, 20.0),
        (0.9, 1, 10.0),
        (0.9, 1, 20.0),
        (0.5, 2, 10.0),
        (0.5, 2, 20.0),
    ] {
        let runtime = 1.0 + 5.0 * alpha + f64::from(solver) + size / 10.0;
        writeln!(file, "{alpha},{solver},{size},{runtime}").unwrap();
    }
    file.flush().unwrap();

    let columns = CsvColumns {
        config_cols: vec![0, 1],
        instance_cols: vec![2],
        response_col: 3,
        categorical_cols: vec![1],
        has_headers: true,
    };
    let config = ForestConfig::builder()
        .seed(5)
        .do_bootstrapping(false)
        .tree(TreeParams {
            split_min: 1,
            ratio_features: 1.0,
            max_depth: None,
        })
        .build()
        .unwrap();
    let (forest, data): (Forest, _) = ForestTrainer::new(config, 2)
        .unwrap()
        .train_from_csv(file.path(), &columns)
        .unwrap();

    assert_eq!(data.configurations.nrows(), 3);
    assert_eq!(data.instances.nrows(), 2);
    assert_eq!(data.n_runs(), 6);
    assert_eq!(forest.config().cat_domain_sizes, vec![0, 3, 0]);

    let out = forest.apply(data.design_matrix().unwrap().view()).unwrap();
    for (row, &y) in data.responses.iter().enumerate() {
        assert_relative_eq!(out.mean()[row], y, max_relative = 1e-12);
    }
}
