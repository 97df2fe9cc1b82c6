//! surrogate-forest: bagged regression trees for algorithm performance
//! prediction.
//!
//! Runs are (configuration, instance) pairs with an observed response such
//! as runtime. A [`Forest`] fitted on them predicts a mean and a variance for
//! any design-matrix row, or for a configuration averaged over a population
//! of instances.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use surrogate_forest::{Forest, ForestConfig, ForestTrainer, RunPair, TrainingData};
//!
//! let data = TrainingData::new(
//!     array![[0.0], [1.0]],
//!     array![[0.0], [1.0]],
//!     vec![RunPair::new(0, 0), RunPair::new(0, 1), RunPair::new(1, 0), RunPair::new(1, 1)],
//!     array![1.0, 2.0, 5.0, 6.0],
//!     vec![],
//! )
//! .unwrap();
//!
//! let config = ForestConfig::builder().seed(3).build().unwrap();
//! let forest: Forest = ForestTrainer::new(config, 8).unwrap().learn_model(&data).unwrap();
//!
//! let out = forest.apply(array![[1.0, 0.0]].view()).unwrap();
//! assert_eq!(out.n_rows(), 1);
//!
//! let marginal = forest.apply_marginal(&[0, 1, 2], array![[0.0], [1.0]].view(), None).unwrap();
//! assert_eq!(marginal.n_rows(), 2);
//! ```

pub mod data;
pub mod inference;
pub mod model;
pub mod persist;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

mod error;

pub use data::{RunPair, TrainingData};
pub use error::ForestError;
pub use inference::Predictions;
pub use model::{ForestConfig, TreeParams};
pub use repr::{Forest, LeafStats, RegressionTree, TreeOracle};
pub use training::{ForestTrainer, TrainError};
