//! Error type for forest construction and prediction.

use crate::model::ConfigError;

/// Errors raised by the forest core.
///
/// Every variant signals a caller or configuration mismatch; none of them is
/// transient, so callers should not retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForestError {
    #[error("invalid number of regression trees in forest: {0}")]
    InvalidTreeCount(usize),

    #[error("bootstrap assignment has {got} rows but the forest has {expected} trees")]
    AssignmentLenMismatch { expected: usize, got: usize },

    #[error("bootstrap index {index} for tree {tree} is out of range for {n_samples} samples")]
    AssignmentIndexOutOfRange {
        tree: usize,
        index: usize,
        n_samples: usize,
    },

    #[error("imputed responses have shape {got:?}, expected {expected:?} (trees x draws)")]
    ImputedShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("{pairs} run pairs but {responses} response values")]
    ResponseLenMismatch { pairs: usize, responses: usize },

    #[error("run {run} references {axis} row {index}, but only {len} rows exist")]
    PairOutOfRange {
        run: usize,
        axis: &'static str,
        index: usize,
        len: usize,
    },

    #[error("expected {expected} feature columns, got {got}")]
    FeatureCountMismatch { expected: usize, got: usize },

    #[error("at least one tree must be selected")]
    EmptyTreeSelection,

    #[error("tree index {index} is out of range for a forest of {n_trees} trees")]
    TreeIndexOutOfRange { index: usize, n_trees: usize },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
