//! Training data loaders.

pub mod csv;
mod error;

pub use self::csv::{CsvColumns, read_training_csv};
pub use error::DataLoadError;
