//! Forest configuration.
//!
//! - [`ForestConfig`]: the immutable build configuration shared by all trees
//! - [`TreeParams`]: nested tree-growing parameters

mod config;
mod params;

pub use config::{ConfigError, ForestConfig, ForestConfigBuilder, DEFAULT_MIN_VARIANCE, DEFAULT_N_TREES};
pub use params::TreeParams;
