//! Tree growing parameters.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Tree structure parameters.
///
/// Controls when a node stops splitting and how many features each split
/// examines.
///
/// # Example
///
/// ```
/// use surrogate_forest::model::TreeParams;
///
/// let params = TreeParams { split_min: 5, ..Default::default() };
/// assert_eq!(params.max_depth, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Nodes holding fewer rows than this become leaves. Default: 10.
    pub split_min: usize,
    /// Fraction of features examined at each split. Default: 5/6.
    pub ratio_features: f64,
    /// Optional depth limit (root has depth 0).
    pub max_depth: Option<u32>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            split_min: 10,
            ratio_features: 5.0 / 6.0,
            max_depth: None,
        }
    }
}

impl TreeParams {
    /// Number of features examined per split out of `n_features`.
    pub fn features_per_split(&self, n_features: usize) -> usize {
        let n = (n_features as f64 * self.ratio_features).ceil() as usize;
        n.clamp(1, n_features.max(1))
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ratio_features > 0.0 && self.ratio_features <= 1.0) {
            return Err(ConfigError::InvalidRatioFeatures(self.ratio_features));
        }
        if self.split_min == 0 {
            return Err(ConfigError::InvalidSplitMin);
        }
        if self.max_depth == Some(0) {
            return Err(ConfigError::InvalidMaxDepth);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_per_split_rounds_up() {
        let params = TreeParams::default();
        assert_eq!(params.features_per_split(6), 5);
        assert_eq!(params.features_per_split(7), 6);
        assert_eq!(params.features_per_split(1), 1);
    }

    #[test]
    fn features_per_split_never_zero() {
        let params = TreeParams {
            ratio_features: 0.01,
            ..Default::default()
        };
        assert_eq!(params.features_per_split(3), 1);
    }
}
