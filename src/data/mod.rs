//! Training data: run index, deduplication, design matrices and loaders.
//!
//! Configurations and instances are stored as separate row matrices and tied
//! together by a run index of [`RunPair`]s, so a configuration evaluated on
//! many instances is held once. [`build_design_matrix`] flattens them into
//! the `(K + L)`-wide rows consumed by prediction.

mod dedup;
mod design;
pub mod io;
mod pairs;
mod training;

pub use dedup::{UniqueRows, dedup_rows};
pub use design::build_design_matrix;
pub use io::{CsvColumns, DataLoadError, read_training_csv};
pub use pairs::RunPair;
pub use training::{DedupAxis, TrainingData};
