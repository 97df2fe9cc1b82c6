//! Prediction output type.

use approx::{AbsDiffEq, RelativeEq};

use super::aggregate::round_to_reference_precision;

/// Ensemble mean and variance per query row.
///
/// # Example
///
/// ```
/// use surrogate_forest::inference::Predictions;
///
/// let out = Predictions::new(vec![5.0, 1.0], vec![4.0, 0.5]);
/// assert_eq!(out.n_rows(), 2);
/// assert_eq!(out.row(0), (5.0, 4.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    mean: Vec<f64>,
    variance: Vec<f64>,
}

impl Predictions {
    /// # Panics
    ///
    /// Panics if the two vectors differ in length.
    pub fn new(mean: Vec<f64>, variance: Vec<f64>) -> Self {
        assert_eq!(
            mean.len(),
            variance.len(),
            "mean has {} rows but variance has {}",
            mean.len(),
            variance.len()
        );
        Self { mean, variance }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.mean.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    #[inline]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[inline]
    pub fn variance(&self) -> &[f64] {
        &self.variance
    }

    /// `(mean, variance)` of one row.
    #[inline]
    pub fn row(&self, idx: usize) -> (f64, f64) {
        (self.mean[idx], self.variance[idx])
    }

    pub fn rows(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mean.iter().copied().zip(self.variance.iter().copied())
    }

    /// Quantize every value with [`round_to_reference_precision`].
    pub fn rounded(mut self) -> Self {
        for v in self.mean.iter_mut().chain(self.variance.iter_mut()) {
            *v = round_to_reference_precision(*v);
        }
        self
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.mean, self.variance)
    }
}

// =============================================================================
// Approx Trait Implementations
// =============================================================================

impl AbsDiffEq for Predictions {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.n_rows() == other.n_rows()
            && self
                .rows()
                .zip(other.rows())
                .all(|(a, b)| a.0.abs_diff_eq(&b.0, epsilon) && a.1.abs_diff_eq(&b.1, epsilon))
    }
}

impl RelativeEq for Predictions {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        self.n_rows() == other.n_rows()
            && self.rows().zip(other.rows()).all(|(a, b)| {
                a.0.relative_eq(&b.0, epsilon, max_relative) && a.1.relative_eq(&b.1, epsilon, max_relative)
            })
    }
}
