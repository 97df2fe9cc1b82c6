//! Error type for training data ingestion.

use std::io;

/// Errors that can occur when loading training data.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("file contains no data rows")]
    Empty,

    #[error("row {row} has no column {column}")]
    MissingColumn { row: usize, column: usize },

    #[error("row {row}, column {column}: cannot parse {value:?} as a number")]
    NotNumeric {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("row {row}, column {column}: categorical code {value} is not a non-negative integer")]
    InvalidCategory { row: usize, column: usize, value: f64 },

    #[error("categorical column {0} is neither a configuration nor an instance column")]
    UnknownCategoricalColumn(usize),

    #[error("column layout is unusable: {0}")]
    Layout(String),
}
