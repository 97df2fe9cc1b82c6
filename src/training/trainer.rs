//! Forest trainer.
//!
//! Orchestrates bootstrap sampling, per-tree subset selection and tree
//! fitting.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use surrogate_forest::data::{RunPair, TrainingData};
//! use surrogate_forest::model::ForestConfig;
//! use surrogate_forest::repr::Forest;
//! use surrogate_forest::training::ForestTrainer;
//!
//! let data = TrainingData::new(
//!     array![[0.0], [1.0]],
//!     array![[5.0]],
//!     vec![RunPair::new(0, 0), RunPair::new(1, 0)],
//!     array![1.0, 3.0],
//!     vec![],
//! )
//! .unwrap();
//!
//! let config = ForestConfig::builder().seed(7).build().unwrap();
//! let trainer = ForestTrainer::new(config, 4).unwrap();
//! let forest: Forest = trainer.learn_model(&data).unwrap();
//! assert_eq!(forest.n_trees(), 4);
//! ```
//!
//! # Randomness
//!
//! One `Xoshiro256PlusPlus` generator, seeded from `config.seed` (or OS
//! entropy), first fills the bootstrap table and then draws one seed per
//! tree. Trees are fitted in parallel, each from its own seed, so a seeded
//! trainer produces the same forest for any thread count.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::logger::TrainingLogger;
use super::sampling::{BootstrapAssignment, BootstrapSampler};
use crate::data::{CsvColumns, DataLoadError, TrainingData, read_training_csv};
use crate::model::{DEFAULT_N_TREES, ForestConfig};
use crate::repr::{Forest, TreeOracle, TreeSample};
use crate::utils::run_with_threads;
use crate::ForestError;

/// Errors from [`ForestTrainer::train_from_csv`].
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Load(#[from] DataLoadError),

    #[error(transparent)]
    Forest(#[from] ForestError),
}

/// Where each tree reads its responses from.
#[derive(Clone, Copy)]
enum Responses<'a> {
    /// One response per run, shared by all trees.
    Shared(ArrayView1<'a, f64>),
    /// `n_trees x n_draws`; entry `[i, j]` is the response of tree `i`'s
    /// `j`-th drawn run.
    PerTree(ArrayView2<'a, f64>),
}

impl Responses<'_> {
    #[inline]
    fn get(&self, tree: usize, draw: usize, run: usize) -> f64 {
        match self {
            Responses::Shared(y) => y[run],
            Responses::PerTree(y) => y[[tree, draw]],
        }
    }
}

/// Fits forests of `n_trees` trees under one [`ForestConfig`].
#[derive(Debug, Clone)]
pub struct ForestTrainer {
    config: ForestConfig,
    n_trees: usize,
}

impl ForestTrainer {
    /// # Errors
    ///
    /// [`ForestError::InvalidTreeCount`] for zero trees,
    /// [`ForestError::Config`] for an invalid configuration.
    pub fn new(config: ForestConfig, n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount(n_trees));
        }
        config.validate()?;
        Ok(Self { config, n_trees })
    }

    /// Ten bootstrapped trees with `split_min = 10`.
    pub fn standard(cat_domain_sizes: Vec<u32>) -> Self {
        Self {
            config: ForestConfig::standard(cat_domain_sizes),
            n_trees: DEFAULT_N_TREES,
        }
    }

    /// One tree over every run, split down to single rows.
    pub fn deterministic(cat_domain_sizes: Vec<u32>) -> Self {
        Self {
            config: ForestConfig::deterministic(cat_domain_sizes),
            n_trees: 1,
        }
    }

    #[inline]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Shared generator for this training run.
    fn make_rng(&self) -> Xoshiro256PlusPlus {
        match self.config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_os_rng(),
        }
    }

    /// Draw this trainer's bootstrap table for `n_samples` runs.
    pub fn sample_assignment<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> BootstrapAssignment {
        BootstrapSampler::new(self.config.do_bootstrapping).sample(n_samples, self.n_trees, rng)
    }

    /// Fit a forest, drawing the bootstrap table from the configured seed.
    pub fn learn_model<T: TreeOracle>(&self, data: &TrainingData) -> Result<Forest<T>, ForestError> {
        data.validate()?;
        let mut rng = self.make_rng();
        let assignment = self.sample_assignment(data.n_runs(), &mut rng);
        self.fit(data, &assignment, Responses::Shared(data.responses.view()), &mut rng)
    }

    /// Fit a forest on a caller-supplied bootstrap table.
    ///
    /// # Errors
    ///
    /// [`ForestError::AssignmentLenMismatch`] if the table does not have one
    /// row per tree.
    pub fn learn_model_with_assignment<T: TreeOracle>(
        &self,
        data: &TrainingData,
        assignment: &BootstrapAssignment,
    ) -> Result<Forest<T>, ForestError> {
        data.validate()?;
        let mut rng = self.make_rng();
        self.fit(data, assignment, Responses::Shared(data.responses.view()), &mut rng)
    }

    /// Fit a forest where tree `i` learns from row `i` of `imputed`
    /// instead of the shared responses.
    ///
    /// `imputed[[i, j]]` is the response of the `j`-th run drawn for tree
    /// `i`, so the matrix is `n_trees x n_runs`. The table is always drawn
    /// with replacement, whatever `do_bootstrapping` says.
    pub fn learn_model_imputed<T: TreeOracle>(
        &self,
        data: &TrainingData,
        imputed: ArrayView2<'_, f64>,
    ) -> Result<Forest<T>, ForestError> {
        data.validate()?;
        let mut rng = self.make_rng();
        let assignment = BootstrapSampler::new(true).sample(data.n_runs(), self.n_trees, &mut rng);
        self.check_imputed(&assignment, imputed)?;
        self.fit(data, &assignment, Responses::PerTree(imputed), &mut rng)
    }

    /// [`Self::learn_model_imputed`] on a caller-supplied bootstrap table.
    ///
    /// `imputed` must be `n_trees x assignment.n_draws()`, one response per
    /// table entry.
    pub fn learn_model_imputed_with_assignment<T: TreeOracle>(
        &self,
        data: &TrainingData,
        imputed: ArrayView2<'_, f64>,
        assignment: &BootstrapAssignment,
    ) -> Result<Forest<T>, ForestError> {
        data.validate()?;
        self.check_imputed(assignment, imputed)?;
        let mut rng = self.make_rng();
        self.fit(data, assignment, Responses::PerTree(imputed), &mut rng)
    }

    /// Load a run table and fit a forest on it.
    ///
    /// Categorical domains found in the file replace the configured ones.
    pub fn train_from_csv<T: TreeOracle>(
        &self,
        path: impl AsRef<Path>,
        columns: &CsvColumns,
    ) -> Result<(Forest<T>, TrainingData), TrainError> {
        let data = read_training_csv(path, columns)?;
        TrainingLogger::new(self.config.verbosity).info(&format!(
            "loaded {} runs: {} configurations x {} features, {} instances x {} features",
            data.n_runs(),
            data.configurations.nrows(),
            data.configurations.ncols(),
            data.instances.nrows(),
            data.instances.ncols()
        ));
        let trainer = Self {
            config: ForestConfig {
                cat_domain_sizes: data.cat_domain_sizes.clone(),
                ..self.config.clone()
            },
            n_trees: self.n_trees,
        };
        let forest = trainer.learn_model(&data)?;
        Ok((forest, data))
    }

    fn check_imputed(&self, assignment: &BootstrapAssignment, imputed: ArrayView2<'_, f64>) -> Result<(), ForestError> {
        let expected = (self.n_trees, assignment.n_draws());
        if imputed.dim() != expected {
            return Err(ForestError::ImputedShapeMismatch {
                expected,
                got: imputed.dim(),
            });
        }
        Ok(())
    }

    /// Configuration stored on the forest: configured categorical domains,
    /// or the data's when none are configured.
    fn effective_config(&self, data: &TrainingData) -> Result<ForestConfig, ForestError> {
        let mut config = self.config.clone();
        if config.cat_domain_sizes.is_empty() {
            config.cat_domain_sizes = data.cat_domain_sizes.clone();
        }
        if !config.cat_domain_sizes.is_empty() && config.cat_domain_sizes.len() != data.n_features() {
            return Err(ForestError::FeatureCountMismatch {
                expected: data.n_features(),
                got: config.cat_domain_sizes.len(),
            });
        }
        Ok(config)
    }

    fn fit<T: TreeOracle>(
        &self,
        data: &TrainingData,
        assignment: &BootstrapAssignment,
        responses: Responses<'_>,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Result<Forest<T>, ForestError> {
        assignment.validate(self.n_trees, data.n_runs())?;
        let config = self.effective_config(data)?;
        let logger = TrainingLogger::new(config.verbosity);
        logger.start_training(self.n_trees, data.n_runs(), config.do_bootstrapping);
        if !config.do_bootstrapping
            && self.n_trees > 1
            && config.tree.features_per_split(data.n_features()) == data.n_features()
        {
            logger.warn("bootstrapping and feature sampling are both off; all trees will be identical");
        }
        let start = Instant::now();

        // Drawn after the bootstrap table, before any parallel work.
        let seeds: Vec<u64> = (0..self.n_trees).map(|_| rng.random()).collect();
        let instances = Arc::new(data.instances.clone());

        let trees: Vec<T> = run_with_threads(config.thread_count(), |parallelism| {
            parallelism.maybe_par_map(0..self.n_trees, |tree_idx| {
                let sample = TreeSample {
                    configurations: data.configurations.view(),
                    instances: Arc::clone(&instances),
                    pairs: assignment.tree(tree_idx).iter().map(|&run| data.pairs[run]).collect(),
                    responses: assignment
                        .tree(tree_idx)
                        .iter()
                        .enumerate()
                        .map(|(draw, &run)| responses.get(tree_idx, draw, run))
                        .collect(),
                };
                let mut tree_rng = Xoshiro256PlusPlus::seed_from_u64(seeds[tree_idx]);
                T::fit(&sample, &config, &mut tree_rng)
            })
        });

        for (idx, tree) in trees.iter().enumerate() {
            logger.log_tree(idx, tree.n_nodes(), tree.n_leaves());
        }
        logger.finish_training(trees.len(), start.elapsed());

        Forest::from_trees(
            trees,
            config,
            data.configurations.ncols(),
            data.instances.ncols(),
        )
    }
}
