//! Forest build configuration with builder pattern.
//!
//! [`ForestConfig`] holds every knob that influences how a forest is trained
//! and how its predictions are post-processed. It uses the `bon` crate for
//! builder generation and validates at build time.
//!
//! # Example
//!
//! ```
//! use surrogate_forest::model::{ForestConfig, TreeParams};
//!
//! // All defaults: bootstrapping on, linear-scale responses
//! let config = ForestConfig::builder().build().unwrap();
//!
//! // Log-scale runtimes, reproducible
//! let config = ForestConfig::builder()
//!     .log_model(true)
//!     .seed(7)
//!     .tree(TreeParams { split_min: 5, ..Default::default() })
//!     .build()
//!     .unwrap();
//! assert!(config.log_model);
//! ```

use std::num::NonZeroUsize;

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::TreeParams;
use crate::training::Verbosity;

/// Number of trees used by the preset builders.
pub const DEFAULT_N_TREES: usize = 10;

/// Default floor applied to every reported variance.
pub const DEFAULT_MIN_VARIANCE: f64 = 1e-14;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Variance floor must be finite and non-negative.
    InvalidMinVariance(f64),
    /// Feature ratio must be in (0, 1].
    InvalidRatioFeatures(f64),
    /// Nodes need at least one row to be considered for a split.
    InvalidSplitMin,
    /// A depth limit of zero would forbid any split.
    InvalidMaxDepth,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMinVariance(v) => {
                write!(f, "min_variance must be finite and non-negative, got {}", v)
            }
            Self::InvalidRatioFeatures(v) => {
                write!(f, "ratio_features must be in (0, 1], got {}", v)
            }
            Self::InvalidSplitMin => write!(f, "split_min must be at least 1"),
            Self::InvalidMaxDepth => write!(f, "max_depth must be at least 1 when set"),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// ForestConfig
// =============================================================================

/// Immutable build configuration shared by every tree of a forest.
///
/// # Structure
///
/// - **Sampling**: `do_bootstrapping`, `seed`
/// - **Response space**: `log_model`, `broken_variance_calculation`
/// - **Output**: `min_variance`
/// - **Tree**: nested [`TreeParams`] and per-column `cat_domain_sizes`
/// - **Resources**: `n_threads`, `verbosity`
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct ForestConfig {
    // === Sampling ===
    /// Draw each tree's rows with replacement. Default: true.
    ///
    /// When false every tree is trained on every row, in order.
    #[builder(default = true)]
    pub do_bootstrapping: bool,

    /// Seed for the shared generator. `None` seeds from OS entropy.
    pub seed: Option<u64>,

    // === Response space ===
    /// Responses are log10-transformed; predictions are reported in log10 space.
    #[builder(default)]
    pub log_model: bool,

    /// Legacy log-space aggregation: `log10(pred)` with untransformed variance.
    ///
    /// Only kept so that historical models reproduce their outputs.
    #[builder(default)]
    pub broken_variance_calculation: bool,

    // === Output ===
    /// Floor applied to every reported variance. Default: 1e-14.
    #[builder(default = DEFAULT_MIN_VARIANCE)]
    pub min_variance: f64,

    // === Tree ===
    /// Tree growing parameters.
    #[builder(default)]
    pub tree: TreeParams,

    /// Domain size per design-matrix column (configuration columns first,
    /// then instance columns). 0 marks a continuous column; an empty vector
    /// marks every column continuous.
    #[builder(default)]
    pub cat_domain_sizes: Vec<u32>,

    // === Resources ===
    /// Number of threads. `None` uses the global rayon pool; any other count
    /// gets a dedicated pool that is built once and shared process-wide.
    pub n_threads: Option<NonZeroUsize>,

    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: forest_config_builder::IsComplete> ForestConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `min_variance` negative or non-finite
    /// - `tree.ratio_features` outside (0, 1]
    /// - `tree.split_min == 0`
    /// - `tree.max_depth == Some(0)`
    pub fn build(self) -> Result<ForestConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl ForestConfig {
    /// Standard surrogate settings: bootstrapping, `split_min = 10`.
    pub fn standard(cat_domain_sizes: Vec<u32>) -> Self {
        Self::builder()
            .cat_domain_sizes(cat_domain_sizes)
            .__build_internal()
    }

    /// Settings for a single tree that reproduces the training responses:
    /// no bootstrapping, `split_min = 1`, every feature considered.
    pub fn deterministic(cat_domain_sizes: Vec<u32>) -> Self {
        Self::builder()
            .do_bootstrapping(false)
            .tree(TreeParams {
                split_min: 1,
                ratio_features: 1.0,
                max_depth: None,
            })
            .cat_domain_sizes(cat_domain_sizes)
            .__build_internal()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_variance.is_finite() || self.min_variance < 0.0 {
            return Err(ConfigError::InvalidMinVariance(self.min_variance));
        }
        self.tree.validate()
    }

    /// Thread count in `run_with_threads` semantics (0 = auto).
    pub fn thread_count(&self) -> usize {
        self.n_threads.map_or(0, NonZeroUsize::get)
    }

    /// Domain size of design-matrix column `feature` (0 = continuous).
    #[inline]
    pub fn domain_size(&self, feature: usize) -> u32 {
        self.cat_domain_sizes.get(feature).copied().unwrap_or(0)
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

// =============================================================================
// Tests
// =============================================================================
