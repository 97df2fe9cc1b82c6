//! Run index: which configuration was evaluated on which instance.

use serde::{Deserialize, Serialize};

/// One observed run: a (configuration row, instance row) pair.
///
/// A run index stores pairs instead of full design rows so that a
/// configuration evaluated on many instances is held only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunPair {
    /// Row in the configuration matrix.
    pub config: usize,
    /// Row in the instance matrix.
    pub instance: usize,
}

impl RunPair {
    #[inline]
    pub const fn new(config: usize, instance: usize) -> Self {
        Self { config, instance }
    }
}

impl From<(usize, usize)> for RunPair {
    fn from((config, instance): (usize, usize)) -> Self {
        Self { config, instance }
    }
}
