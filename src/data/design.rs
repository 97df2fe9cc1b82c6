//! Flat design matrix assembly from configurations, instances and runs.

use ndarray::{Array2, ArrayView2, s};

use super::RunPair;
use crate::ForestError;

/// Build the `n_runs x (K + L)` matrix consumed by prediction routines.
///
/// Row `i` is the configuration row of `pairs[i]` followed by its instance
/// row.
///
/// # Errors
///
/// Returns [`ForestError::PairOutOfRange`] if a pair references a missing row.
pub fn build_design_matrix(
    configurations: ArrayView2<'_, f64>,
    instances: ArrayView2<'_, f64>,
    pairs: &[RunPair],
) -> Result<Array2<f64>, ForestError> {
    let n_config_features = configurations.ncols();
    let n_instance_features = instances.ncols();
    let mut design = Array2::zeros((pairs.len(), n_config_features + n_instance_features));

    for (run, pair) in pairs.iter().enumerate() {
        check_pair(run, pair, configurations.nrows(), instances.nrows())?;
        let mut row = design.row_mut(run);
        row.slice_mut(s![..n_config_features])
            .assign(&configurations.row(pair.config));
        row.slice_mut(s![n_config_features..])
            .assign(&instances.row(pair.instance));
    }

    Ok(design)
}

/// Verify that `pair` references existing rows.
pub(crate) fn check_pair(
    run: usize,
    pair: &RunPair,
    n_configurations: usize,
    n_instances: usize,
) -> Result<(), ForestError> {
    if pair.config >= n_configurations {
        return Err(ForestError::PairOutOfRange {
            run,
            axis: "configuration",
            index: pair.config,
            len: n_configurations,
        });
    }
    if pair.instance >= n_instances {
        return Err(ForestError::PairOutOfRange {
            run,
            axis: "instance",
            index: pair.instance,
            len: n_instances,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn concatenates_config_then_instance() {
        let configs = array![[1.0, 2.0], [3.0, 4.0]];
        let instances = array![[10.0], [20.0], [30.0]];
        let pairs = [RunPair::new(1, 0), RunPair::new(0, 2)];

        let design = build_design_matrix(configs.view(), instances.view(), &pairs).unwrap();
        assert_eq!(design, array![[3.0, 4.0, 10.0], [1.0, 2.0, 30.0]]);
    }

    #[test]
    fn rejects_dangling_instance() {
        let configs = array![[1.0]];
        let instances = array![[10.0]];
        let pairs = [RunPair::new(0, 3)];

        let err = build_design_matrix(configs.view(), instances.view(), &pairs).unwrap_err();
        assert_eq!(
            err,
            ForestError::PairOutOfRange {
                run: 0,
                axis: "instance",
                index: 3,
                len: 1
            }
        );
    }

    #[test]
    fn no_runs_gives_empty_matrix() {
        let configs = array![[1.0, 2.0]];
        let instances = array![[10.0]];
        let design = build_design_matrix(configs.view(), instances.view(), &[]).unwrap();
        assert_eq!(design.dim(), (0, 3));
    }
}
