//! Forest inference: point, marginal and classification queries.
//!
//! All queries are methods on [`Forest`](crate::repr::Forest):
//!
//! - [`apply`](crate::repr::Forest::apply) /
//!   [`apply_rounded`](crate::repr::Forest::apply_rounded): design-matrix rows
//! - [`apply_marginal`](crate::repr::Forest::apply_marginal) and friends:
//!   configuration rows averaged over an instance population
//! - [`classify`](crate::repr::Forest::classify): majority vote
//! - [`leaf_indices`](crate::repr::Forest::leaf_indices): raw traversal
//!
//! Per-tree work runs in parallel; contributions are always reduced in tree
//! order, so results do not depend on the thread count.

mod aggregate;
mod classify;
mod marginal;
mod output;
mod predictor;

pub use aggregate::{
    EnsembleAccumulator, NEGATIVE_VARIANCE_TOLERANCE, REFERENCE_PRECISION_MASK, ResponseTransform, bessel_factor,
    floor_variance, round_to_reference_precision,
};
pub use classify::modes;
pub use output::Predictions;
