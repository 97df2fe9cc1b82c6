//! Verbosity-gated training logger.
//!
//! Messages go through the `log` facade; [`Verbosity`] decides which of them
//! are emitted at all, independently of the installed logger's filter.

use serde::{Deserialize, Serialize};

const TARGET: &str = "surrogate_forest::training";

/// Verbosity level for training output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Errors and warnings only.
    Warning,
    /// Progress and important information.
    Info,
    /// Detailed debugging information.
    Debug,
}

/// Logger used by [`ForestTrainer`](super::ForestTrainer).
#[derive(Debug, Clone, Copy)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn start_training(&self, n_trees: usize, n_samples: usize, bootstrapping: bool) {
        if self.verbosity >= Verbosity::Info {
            log::info!(
                target: TARGET,
                "fitting {n_trees} trees on {n_samples} runs (bootstrapping: {bootstrapping})"
            );
        }
    }

    pub fn log_tree(&self, tree_idx: usize, n_nodes: usize, n_leaves: usize) {
        if self.verbosity >= Verbosity::Debug {
            log::debug!(target: TARGET, "tree {tree_idx}: {n_nodes} nodes, {n_leaves} leaves");
        }
    }

    pub fn finish_training(&self, n_trees: usize, elapsed: std::time::Duration) {
        if self.verbosity >= Verbosity::Info {
            log::info!(target: TARGET, "fitted {n_trees} trees in {elapsed:.2?}");
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Info {
            log::info!(target: TARGET, "{message}");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Warning {
            log::warn!(target: TARGET, "{message}");
        }
    }
}
