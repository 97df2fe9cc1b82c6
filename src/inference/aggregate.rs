//! Ensemble combination of per-tree statistics.
//!
//! Each tree contributes a `(pred, var)` pair. The ensemble mean and
//! variance follow the law of total variance:
//!
//! ```text
//! mean = sum(pred) / n_used
//! var  = (sum(var + pred^2) / n_used - mean^2) * n_total / max(1, n_total - 1)
//! ```
//!
//! `n_used` is the number of contributing trees and `n_total` the size of the
//! forest; they differ only for marginal queries over a subset of trees.

use std::f64::consts::LN_10;

use super::Predictions;
use crate::model::ForestConfig;
use crate::repr::LeafStats;

/// Variances below this indicate an arithmetic fault rather than rounding.
pub const NEGATIVE_VARIANCE_TOLERANCE: f64 = -1e-6;

/// Mask applied to the `f32` bit pattern by [`round_to_reference_precision`].
pub const REFERENCE_PRECISION_MASK: u32 = 0xFFFF_F800;

// =============================================================================
// ResponseTransform
// =============================================================================

/// Per-tree transform applied before accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTransform {
    /// Linear-scale model; statistics are used as is.
    Identity,
    /// `pred -> log10(pred)`, variance untouched.
    ///
    /// Used by the legacy log-model formula and by every marginal query of a
    /// log model. The variance stays in linear space, which is inconsistent
    /// with the mean, but historical models depend on these outputs.
    Log10Pred,
    /// Log-normal moment matching into log10 space.
    LogNormal,
}

impl ResponseTransform {
    /// Transform used for point predictions.
    pub fn for_prediction(config: &ForestConfig) -> Self {
        match (config.log_model, config.broken_variance_calculation) {
            (false, _) => ResponseTransform::Identity,
            (true, true) => ResponseTransform::Log10Pred,
            (true, false) => ResponseTransform::LogNormal,
        }
    }

    /// Transform used for marginal predictions. Never moment-matched.
    pub fn for_marginal(config: &ForestConfig) -> Self {
        if config.log_model {
            ResponseTransform::Log10Pred
        } else {
            ResponseTransform::Identity
        }
    }

    #[inline]
    pub fn apply(self, stats: LeafStats) -> LeafStats {
        match self {
            ResponseTransform::Identity => stats,
            ResponseTransform::Log10Pred => LeafStats::new(stats.mean.log10(), stats.variance),
            ResponseTransform::LogNormal => {
                let mu = stats.mean;
                let var_ln = (stats.variance / (mu * mu) + 1.0).ln();
                let mu_ln = mu.ln() - var_ln / 2.0;
                LeafStats::new(mu_ln / LN_10, var_ln / LN_10 / LN_10)
            }
        }
    }
}

// =============================================================================
// EnsembleAccumulator
// =============================================================================

/// Running first and second moments across trees for one query row.
///
/// Contributions must be pushed in tree order for reproducible results.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnsembleAccumulator {
    sum_pred: f64,
    sum_second: f64,
    n_used: usize,
}

impl EnsembleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one (already transformed) tree contribution.
    #[inline]
    pub fn push(&mut self, contribution: LeafStats) {
        self.sum_pred += contribution.mean;
        self.sum_second += contribution.variance + contribution.mean * contribution.mean;
        self.n_used += 1;
    }

    #[inline]
    pub fn n_used(&self) -> usize {
        self.n_used
    }

    /// Ensemble mean and floored, Bessel-corrected variance.
    pub fn finish(&self, n_total: usize, min_variance: f64) -> LeafStats {
        let n = self.n_used as f64;
        let mean = self.sum_pred / n;
        let mut variance = self.sum_second / n;
        variance -= mean * mean;
        variance *= bessel_factor(n_total);
        LeafStats::new(mean, floor_variance(variance, min_variance))
    }
}

/// Combine per-tree contributions (`per_tree[t][row]`) into one prediction
/// per row, reducing trees in order.
pub(crate) fn combine_trees(per_tree: &[Vec<LeafStats>], n_rows: usize, n_total: usize, min_variance: f64) -> Predictions {
    let mut mean = Vec::with_capacity(n_rows);
    let mut variance = Vec::with_capacity(n_rows);
    for row in 0..n_rows {
        let mut acc = EnsembleAccumulator::new();
        for tree in per_tree {
            acc.push(tree[row]);
        }
        let out = acc.finish(n_total, min_variance);
        mean.push(out.mean);
        variance.push(out.variance);
    }
    Predictions::new(mean, variance)
}

/// `n / max(1, n - 1)`.
#[inline]
pub fn bessel_factor(n_total: usize) -> f64 {
    n_total as f64 / n_total.saturating_sub(1).max(1) as f64
}

/// Floor `variance` at `min_variance`.
///
/// Values below [`NEGATIVE_VARIANCE_TOLERANCE`] fail a debug assertion and
/// are logged in release builds before flooring. NaN passes through.
#[inline]
pub fn floor_variance(variance: f64, min_variance: f64) -> f64 {
    debug_assert!(
        !(variance < NEGATIVE_VARIANCE_TOLERANCE),
        "ensemble variance {variance} is below {NEGATIVE_VARIANCE_TOLERANCE}"
    );
    if variance < NEGATIVE_VARIANCE_TOLERANCE {
        log::warn!("ensemble variance {variance} is below {NEGATIVE_VARIANCE_TOLERANCE}; flooring to {min_variance}");
    }
    if variance < min_variance { min_variance } else { variance }
}

/// Quantize to `f32` and clear the low 11 mantissa bits.
///
/// Matches outputs of a reference implementation that works at this
/// precision. Idempotent.
#[inline]
pub fn round_to_reference_precision(value: f64) -> f64 {
    let bits = (value as f32).to_bits() & REFERENCE_PRECISION_MASK;
    f64::from(f32::from_bits(bits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn combine(contributions: &[LeafStats], n_total: usize, min_variance: f64) -> LeafStats {
        let mut acc = EnsembleAccumulator::new();
        for &c in contributions {
            acc.push(c);
        }
        acc.finish(n_total, min_variance)
    }

    #[test]
    fn two_tree_example() {
        let out = combine(&[LeafStats::new(4.0, 1.0), LeafStats::new(6.0, 1.0)], 2, 1e-14);
        assert_eq!(out, LeafStats::new(5.0, 4.0));
    }

    #[test]
    fn subset_uses_total_for_bessel() {
        let out = combine(&[LeafStats::new(3.0, 0.5)], 3, 1e-14);
        assert_eq!(out, LeafStats::new(3.0, 0.75));
    }

    #[test]
    fn single_tree_factor_is_one() {
        assert_eq!(bessel_factor(1), 1.0);
        let out = combine(&[LeafStats::new(2.0, 0.25)], 1, 0.0);
        assert_eq!(out, LeafStats::new(2.0, 0.25));
    }

    #[rstest]
    #[case(2, 2.0)]
    #[case(3, 1.5)]
    #[case(10, 10.0 / 9.0)]
    fn bessel_factors(#[case] n: usize, #[case] expected: f64) {
        assert_eq!(bessel_factor(n), expected);
    }

    #[test]
    fn small_negative_variance_is_floored() {
        assert_eq!(floor_variance(-1e-9, 1e-14), 1e-14);
        assert_eq!(floor_variance(0.0, 1e-14), 1e-14);
        assert_eq!(floor_variance(0.5, 1e-14), 0.5);
    }

    #[test]
    fn nan_variance_propagates() {
        assert!(floor_variance(f64::NAN, 1e-14).is_nan());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "ensemble variance")]
    fn large_negative_variance_asserts_in_debug() {
        floor_variance(-1.0, 1e-14);
    }

    #[test]
    fn log10_pred_keeps_variance() {
        let out = ResponseTransform::Log10Pred.apply(LeafStats::new(100.0, 7.0));
        assert_eq!(out, LeafStats::new(2.0, 7.0));
    }

    #[test]
    fn log_normal_moment_matching() {
        let mu: f64 = 10.0;
        let var: f64 = 4.0;
        let out = ResponseTransform::LogNormal.apply(LeafStats::new(mu, var));

        let var_ln = (var / (mu * mu) + 1.0).ln();
        assert_relative_eq!(out.variance, var_ln / (LN_10 * LN_10), max_relative = 1e-14);
        assert_relative_eq!(out.mean, (mu.ln() - var_ln / 2.0) / LN_10, max_relative = 1e-14);
    }

    #[test]
    fn log_normal_with_zero_variance_is_plain_log10() {
        let out = ResponseTransform::LogNormal.apply(LeafStats::new(1000.0, 0.0));
        assert_relative_eq!(out.mean, 3.0, max_relative = 1e-15);
        assert_eq!(out.variance, 0.0);
    }

    #[test]
    fn transform_selection() {
        let linear = ForestConfig::default();
        assert_eq!(ResponseTransform::for_prediction(&linear), ResponseTransform::Identity);
        assert_eq!(ResponseTransform::for_marginal(&linear), ResponseTransform::Identity);

        let log = ForestConfig::builder().log_model(true).build().unwrap();
        assert_eq!(ResponseTransform::for_prediction(&log), ResponseTransform::LogNormal);
        assert_eq!(ResponseTransform::for_marginal(&log), ResponseTransform::Log10Pred);

        let legacy = ForestConfig::builder()
            .log_model(true)
            .broken_variance_calculation(true)
            .build()
            .unwrap();
        assert_eq!(ResponseTransform::for_prediction(&legacy), ResponseTransform::Log10Pred);
    }

    #[test]
    fn rounding_clears_low_mantissa_bits() {
        let r = round_to_reference_precision(1.0 + 1e-6);
        assert_eq!((r as f32).to_bits() & !REFERENCE_PRECISION_MASK, 0);
        assert_eq!(round_to_reference_precision(1.0), 1.0);
        assert_eq!(round_to_reference_precision(0.0), 0.0);
    }

    proptest! {
        #[test]
        fn rounding_is_a_fixed_point(v in -1e30f64..1e30) {
            let once = round_to_reference_precision(v);
            prop_assert_eq!(round_to_reference_precision(once).to_bits(), once.to_bits());
        }

        #[test]
        fn mean_within_tree_range(preds in prop::collection::vec(-1e3f64..1e3, 1..20)) {
            let contributions: Vec<_> = preds.iter().map(|&p| LeafStats::new(p, 0.0)).collect();
            let out = combine(&contributions, preds.len(), 0.0);
            let lo = preds.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = preds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(out.mean >= lo - 1e-9 * lo.abs().max(1.0));
            prop_assert!(out.mean <= hi + 1e-9 * hi.abs().max(1.0));
        }

        #[test]
        fn variance_never_below_floor(
            stats in prop::collection::vec((0.1f64..100.0, 0.0f64..10.0), 1..12),
            min_variance in 0.0f64..1.0,
        ) {
            let contributions: Vec<_> = stats.iter().map(|&(m, v)| LeafStats::new(m, v)).collect();
            let out = combine(&contributions, contributions.len(), min_variance);
            prop_assert!(out.variance >= min_variance);
        }
    }
}
