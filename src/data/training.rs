//! Training data container: configurations, instances, runs and responses.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::dedup::dedup_rows;
use super::design::{build_design_matrix, check_pair};
use super::RunPair;
use crate::ForestError;

/// Which side of the run index to deduplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupAxis {
    Configurations,
    Instances,
}

/// Raw training data for a forest.
///
/// `pairs[i]` is the run whose observed response is `responses[i]`.
/// `cat_domain_sizes` has one entry per design-matrix column (configuration
/// columns first) or is empty when every column is continuous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingData {
    pub configurations: Array2<f64>,
    pub instances: Array2<f64>,
    pub pairs: Vec<RunPair>,
    pub responses: Array1<f64>,
    pub cat_domain_sizes: Vec<u32>,
}

impl TrainingData {
    /// Assemble and validate training data.
    ///
    /// # Errors
    ///
    /// See [`TrainingData::validate`].
    pub fn new(
        configurations: Array2<f64>,
        instances: Array2<f64>,
        pairs: Vec<RunPair>,
        responses: Array1<f64>,
        cat_domain_sizes: Vec<u32>,
    ) -> Result<Self, ForestError> {
        let data = Self {
            configurations,
            instances,
            pairs,
            responses,
            cat_domain_sizes,
        };
        data.validate()?;
        Ok(data)
    }

    /// Number of observed runs.
    #[inline]
    pub fn n_runs(&self) -> usize {
        self.pairs.len()
    }

    /// Design-matrix width: configuration columns plus instance columns.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.configurations.ncols() + self.instances.ncols()
    }

    /// Check that responses line up with runs, every run references existing
    /// rows and the categorical domain vector has a usable width.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.pairs.len() != self.responses.len() {
            return Err(ForestError::ResponseLenMismatch {
                pairs: self.pairs.len(),
                responses: self.responses.len(),
            });
        }
        for (run, pair) in self.pairs.iter().enumerate() {
            check_pair(run, pair, self.configurations.nrows(), self.instances.nrows())?;
        }
        if !self.cat_domain_sizes.is_empty() && self.cat_domain_sizes.len() != self.n_features() {
            return Err(ForestError::FeatureCountMismatch {
                expected: self.n_features(),
                got: self.cat_domain_sizes.len(),
            });
        }
        Ok(())
    }

    /// Collapse duplicate rows of one axis and remap that side of every run.
    ///
    /// The other axis and the responses are untouched. Applying this twice is
    /// a no-op.
    pub fn make_unique(&mut self, axis: DedupAxis) {
        match axis {
            DedupAxis::Configurations => {
                let unique = dedup_rows(self.configurations.view());
                for pair in &mut self.pairs {
                    pair.config = unique.mapping[pair.config];
                }
                self.configurations = unique.rows;
            }
            DedupAxis::Instances => {
                let unique = dedup_rows(self.instances.view());
                for pair in &mut self.pairs {
                    pair.instance = unique.mapping[pair.instance];
                }
                self.instances = unique.rows;
            }
        }
    }

    /// Flat `n_runs x (K + L)` design matrix.
    pub fn design_matrix(&self) -> Result<Array2<f64>, ForestError> {
        build_design_matrix(self.configurations.view(), self.instances.view(), &self.pairs)
    }
}
