//! Model representations: the tree contract, the reference tree and the forest.

mod forest;
mod oracle;
mod tree;

pub(crate) use forest::check_width;
pub use forest::{Forest, ForestValidationError};
pub use oracle::{LeafStats, NodeId, TreeOracle, TreeSample, TreeValidationError};
pub use tree::{RegressionTree, SplitKind, TreeBuilder};
