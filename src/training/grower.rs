//! Greedy regression tree growing.
//!
//! Nodes are expanded depth-first from an explicit stack. At each node a
//! random subset of features is scanned for the split with the smallest sum
//! of squared errors over both children:
//!
//! - numeric features: candidate thresholds are midpoints between adjacent
//!   distinct values, `value <= threshold` goes left
//! - categorical features: one category against the rest, `value == code`
//!   goes left
//!
//! A node becomes a leaf when it holds fewer than `split_min` rows, all of
//! its responses are equal, it sits at `max_depth`, or no feature separates
//! its rows.

use std::sync::Arc;

use rand::Rng;

use crate::model::{ForestConfig, TreeParams};
use crate::repr::{NodeId, RegressionTree, SplitKind, TreeBuilder, TreeSample};

/// Best split found for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    kind: SplitKind,
    /// Left SSE + right SSE.
    sse: f64,
}

/// Running sums for SSE computation.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl Moments {
    #[inline]
    fn push(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sum_sq += y * y;
    }

    #[inline]
    fn minus(self, other: Moments) -> Moments {
        Moments {
            count: self.count - other.count,
            sum: self.sum - other.sum,
            sum_sq: self.sum_sq - other.sum_sq,
        }
    }

    #[inline]
    fn sse(self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum_sq - self.sum * self.sum / self.count as f64
    }
}

/// Grows one [`RegressionTree`] from a bootstrap sample.
pub struct TreeGrower<'s, 'a> {
    sample: &'s TreeSample<'a>,
    params: &'s TreeParams,
    cat_domain_sizes: &'s [u32],
    n_features: usize,
    features_per_split: usize,
}

impl<'s, 'a> TreeGrower<'s, 'a> {
    pub fn new(sample: &'s TreeSample<'a>, config: &'s ForestConfig) -> Self {
        let n_features = sample.n_features();
        Self {
            sample,
            params: &config.tree,
            cat_domain_sizes: &config.cat_domain_sizes,
            n_features,
            features_per_split: config.tree.features_per_split(n_features),
        }
    }

    /// Grow the tree. `rng` only drives per-node feature sampling.
    pub fn grow<R: Rng + ?Sized>(&self, rng: &mut R) -> RegressionTree {
        let mut builder = TreeBuilder::new();
        let root = builder.init_root();
        let mut features: Vec<usize> = (0..self.n_features).collect();
        let mut stack: Vec<(NodeId, Vec<usize>, u32)> =
            vec![(root, (0..self.sample.n_rows()).collect(), 0)];

        while let Some((node, rows, depth)) = stack.pop() {
            let split = if self.can_split(&rows, depth) {
                let candidates = self.sample_features(&mut features, rng);
                self.find_best_split(&rows, &candidates)
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                        .into_iter()
                        .partition(|&r| split.kind.goes_left(self.sample.feature(r, split.feature), split.threshold));
                    let (left, right) = builder.apply_split(node, split.feature as u32, split.threshold, split.kind);
                    stack.push((right, right_rows, depth + 1));
                    stack.push((left, left_rows, depth + 1));
                }
                None => {
                    let responses = rows.iter().map(|&r| self.sample.responses[r]).collect();
                    builder.make_leaf(node, responses);
                }
            }
        }

        builder.freeze(
            self.sample.n_config_features(),
            Arc::clone(&self.sample.instances),
        )
    }

    fn can_split(&self, rows: &[usize], depth: u32) -> bool {
        if rows.len() < 2 || rows.len() < self.params.split_min {
            return false;
        }
        if self.params.max_depth.is_some_and(|max| depth >= max) {
            return false;
        }
        let first = self.sample.responses[rows[0]];
        rows.iter().any(|&r| self.sample.responses[r] != first)
    }

    /// Partial Fisher-Yates over `features`; returns the sampled prefix sorted.
    fn sample_features<R: Rng + ?Sized>(&self, features: &mut [usize], rng: &mut R) -> Vec<usize> {
        let k = self.features_per_split;
        if k >= features.len() {
            return (0..self.n_features).collect();
        }
        for i in 0..k {
            let j = rng.random_range(i..features.len());
            features.swap(i, j);
        }
        let mut sampled = features[..k].to_vec();
        sampled.sort_unstable();
        sampled
    }

    fn find_best_split(&self, rows: &[usize], features: &[usize]) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        for &feature in features {
            let candidate = if self.is_categorical(feature) {
                self.best_categorical_split(rows, feature)
            } else {
                self.best_numeric_split(rows, feature)
            };
            if let Some(c) = candidate {
                if best.is_none_or(|b| c.sse < b.sse) {
                    best = Some(c);
                }
            }
        }
        best
    }

    #[inline]
    fn is_categorical(&self, feature: usize) -> bool {
        self.cat_domain_sizes.get(feature).is_some_and(|&size| size > 0)
    }

    /// Sorted `(value, response)` pairs of `feature` over `rows`.
    fn sorted_column(&self, rows: &[usize], feature: usize) -> Vec<(f64, f64)> {
        let mut column: Vec<(f64, f64)> = rows
            .iter()
            .map(|&r| (self.sample.feature(r, feature), self.sample.responses[r]))
            .collect();
        column.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
        column
    }

    fn best_numeric_split(&self, rows: &[usize], feature: usize) -> Option<SplitCandidate> {
        let column = self.sorted_column(rows, feature);
        let mut total = Moments::default();
        for &(_, y) in &column {
            total.push(y);
        }

        let mut best: Option<SplitCandidate> = None;
        let mut left = Moments::default();
        for pair in column.windows(2) {
            let (value, y) = pair[0];
            let next = pair[1].0;
            left.push(y);
            if !(value < next) {
                continue;
            }
            let sse = left.sse() + total.minus(left).sse();
            if best.is_none_or(|b| sse < b.sse) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(value, next),
                    kind: SplitKind::Numeric,
                    sse,
                });
            }
        }
        best
    }

    fn best_categorical_split(&self, rows: &[usize], feature: usize) -> Option<SplitCandidate> {
        let column = self.sorted_column(rows, feature);
        let mut total = Moments::default();
        for &(_, y) in &column {
            total.push(y);
        }

        let mut best: Option<SplitCandidate> = None;
        for group in column.chunk_by(|a, b| a.0.to_bits() == b.0.to_bits()) {
            let code = group[0].0;
            if code.is_nan() || group.len() == column.len() {
                continue;
            }
            let mut inside = Moments::default();
            for &(_, y) in group {
                inside.push(y);
            }
            let sse = inside.sse() + total.minus(inside).sse();
            if best.is_none_or(|b| sse < b.sse) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: code,
                    kind: SplitKind::Categorical,
                    sse,
                });
            }
        }
        best
    }
}

/// Threshold strictly between `lo` and `hi` when representable, else `lo`.
#[inline]
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= lo && mid < hi { mid } else { lo }
}
