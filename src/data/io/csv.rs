//! CSV loader for run tables.
//!
//! Every CSV row is one observed run. The caller names which columns hold
//! configuration features, instance features and the response; both feature
//! blocks are deduplicated after loading so each distinct configuration and
//! instance is stored once.

use std::path::Path;

use ndarray::{Array1, Array2};

use super::DataLoadError;
use crate::data::{DedupAxis, RunPair, TrainingData};

/// Column layout of a run table. Indices are zero-based CSV columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvColumns {
    pub config_cols: Vec<usize>,
    pub instance_cols: Vec<usize>,
    pub response_col: usize,
    /// Columns holding integer category codes. Each must also appear in
    /// `config_cols` or `instance_cols`.
    pub categorical_cols: Vec<usize>,
    pub has_headers: bool,
}

impl CsvColumns {
    /// Design-matrix column order: configuration columns, then instance columns.
    fn design_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.config_cols.iter().chain(&self.instance_cols).copied()
    }

    fn validate(&self) -> Result<(), DataLoadError> {
        if self.config_cols.is_empty() {
            return Err(DataLoadError::Layout("no configuration columns".into()));
        }
        if self.design_columns().any(|c| c == self.response_col) {
            return Err(DataLoadError::Layout(format!(
                "response column {} is also a feature column",
                self.response_col
            )));
        }
        if let Some(&col) = self
            .categorical_cols
            .iter()
            .find(|c| !self.design_columns().any(|d| d == **c))
        {
            return Err(DataLoadError::UnknownCategoricalColumn(col));
        }
        Ok(())
    }
}

/// Load a run table into deduplicated [`TrainingData`].
///
/// Categorical domain sizes are `max code + 1` per categorical column; if no
/// column is categorical the domain vector is left empty.
///
/// # Errors
///
/// Returns [`DataLoadError`] on I/O or CSV failures, cells that do not parse
/// as numbers, negative or fractional category codes, and an empty table.
pub fn read_training_csv(
    path: impl AsRef<Path>,
    columns: &CsvColumns,
) -> Result<TrainingData, DataLoadError> {
    columns.validate()?;

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(columns.has_headers)
        .trim(::csv::Trim::All)
        .from_path(path.as_ref())?;

    let n_config = columns.config_cols.len();
    let n_instance = columns.instance_cols.len();
    let mut config_values = Vec::new();
    let mut instance_values = Vec::new();
    let mut responses = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |column: usize| -> Result<f64, DataLoadError> {
            let raw = record
                .get(column)
                .ok_or(DataLoadError::MissingColumn { row, column })?;
            raw.parse::<f64>().map_err(|_| DataLoadError::NotNumeric {
                row,
                column,
                value: raw.to_string(),
            })
        };

        for &c in &columns.config_cols {
            config_values.push(cell(c)?);
        }
        for &c in &columns.instance_cols {
            instance_values.push(cell(c)?);
        }
        responses.push(cell(columns.response_col)?);
    }

    let n_runs = responses.len();
    if n_runs == 0 {
        return Err(DataLoadError::Empty);
    }

    let configurations = Array2::from_shape_vec((n_runs, n_config), config_values)
        .map_err(|e| DataLoadError::Layout(e.to_string()))?;
    let instances = Array2::from_shape_vec((n_runs, n_instance), instance_values)
        .map_err(|e| DataLoadError::Layout(e.to_string()))?;

    let cat_domain_sizes = categorical_domains(columns, &configurations, &instances)?;
    let pairs = (0..n_runs).map(|i| RunPair::new(i, i)).collect();

    let mut data = TrainingData {
        configurations,
        instances,
        pairs,
        responses: Array1::from_vec(responses),
        cat_domain_sizes,
    };
    data.make_unique(DedupAxis::Configurations);
    data.make_unique(DedupAxis::Instances);

    log::debug!(
        "loaded {} runs over {} configurations and {} instances",
        data.n_runs(),
        data.configurations.nrows(),
        data.instances.nrows()
    );
    Ok(data)
}

fn categorical_domains(
    columns: &CsvColumns,
    configurations: &Array2<f64>,
    instances: &Array2<f64>,
) -> Result<Vec<u32>, DataLoadError> {
    if columns.categorical_cols.is_empty() {
        return Ok(Vec::new());
    }

    let n_config = columns.config_cols.len();
    columns
        .design_columns()
        .enumerate()
        .map(|(design_col, csv_col)| {
            if !columns.categorical_cols.contains(&csv_col) {
                return Ok(0);
            }
            let values = if design_col < n_config {
                configurations.column(design_col)
            } else {
                instances.column(design_col - n_config)
            };
            let mut max_code = 0u32;
            for (row, &value) in values.iter().enumerate() {
                if !(value >= 0.0 && value.fract() == 0.0 && value < u32::MAX as f64) {
                    return Err(DataLoadError::InvalidCategory {
                        row,
                        column: csv_col,
                        value,
                    });
                }
                max_code = max_code.max(value as u32);
            }
            Ok(max_code + 1)
        })
        .collect()
}
