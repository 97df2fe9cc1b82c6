//! Saving and loading forests.
//!
//! A saved model is one [`native`] frame whose payload is the postcard
//! encoding of the forest (configuration included) and, optionally, the
//! training data it was fitted on. Floating-point values are stored bit for
//! bit, so a loaded forest predicts exactly like the one that was saved.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use surrogate_forest::persist::{deserialize_forest, serialize_forest};
//! use surrogate_forest::{Forest, ForestTrainer, RunPair, TrainingData};
//!
//! let data = TrainingData::new(
//!     array![[0.0], [1.0]],
//!     array![[0.0]],
//!     vec![RunPair::new(0, 0), RunPair::new(1, 0)],
//!     array![1.0, 3.0],
//!     vec![],
//! )
//! .unwrap();
//! let forest: Forest = ForestTrainer::deterministic(vec![]).learn_model(&data).unwrap();
//!
//! let bytes = serialize_forest(&forest, Some(&data)).unwrap();
//! let saved = deserialize_forest::<surrogate_forest::RegressionTree>(&bytes).unwrap();
//! assert_eq!(saved.forest, forest);
//! assert_eq!(saved.training_data, Some(data));
//! ```

pub mod native;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use native::{
    DeserializeError, FormatFlags, FormatHeader, HEADER_SIZE, MAGIC, SerializeError,
    read_frame, write_frame,
};

use crate::data::TrainingData;
use crate::repr::{Forest, TreeOracle};

/// A forest read back from storage, with its training data if it was saved.
#[derive(Debug, Clone)]
pub struct SavedForest<T> {
    pub forest: Forest<T>,
    pub training_data: Option<TrainingData>,
}

#[derive(Serialize)]
struct PayloadRef<'a, T> {
    forest: &'a Forest<T>,
    training_data: Option<&'a TrainingData>,
}

#[derive(Deserialize)]
struct Payload<T> {
    forest: Forest<T>,
    training_data: Option<TrainingData>,
}

// ============================================================================
// Streams
// ============================================================================

/// Write `forest` (and optionally its training data) to `writer`.
pub fn write_forest<T, W>(
    writer: &mut W,
    forest: &Forest<T>,
    training_data: Option<&TrainingData>,
) -> Result<(), SerializeError>
where
    T: TreeOracle + Serialize,
    W: Write,
{
    let n_trees = u32::try_from(forest.n_trees()).map_err(|_| SerializeError::TooLarge {
        field: "tree count",
        value: forest.n_trees(),
    })?;
    let n_features = u32::try_from(forest.n_features()).map_err(|_| SerializeError::TooLarge {
        field: "feature count",
        value: forest.n_features(),
    })?;

    let mut header = FormatHeader::new(n_trees, n_features);
    if forest.config().cat_domain_sizes.iter().any(|&size| size > 0) {
        header.flags.set(FormatFlags::HAS_CATEGORICAL);
    }
    if forest.log_model() {
        header.flags.set(FormatFlags::LOG_MODEL);
    }
    if training_data.is_some() {
        header.flags.set(FormatFlags::HAS_TRAINING_DATA);
    }

    let payload = postcard::to_allocvec(&PayloadRef { forest, training_data })?;
    write_frame(writer, &mut header, &payload)?;

    log::debug!(
        "serialized forest: {} trees, {} features, {} payload bytes",
        n_trees,
        n_features,
        payload.len()
    );
    Ok(())
}

/// Read a forest written by [`write_forest`].
///
/// The decoded payload is cross-checked against the header and every tree
/// is structurally validated, so a loaded forest cannot index out of bounds
/// at prediction time. Failures are reported as
/// [`DeserializeError::CorruptPayload`].
pub fn read_forest<T, R>(reader: &mut R) -> Result<SavedForest<T>, DeserializeError>
where
    T: TreeOracle + DeserializeOwned,
    R: Read,
{
    let (header, bytes) = read_frame(reader)?;
    let payload: Payload<T> = postcard::from_bytes(&bytes)?;
    let forest = payload.forest;

    if forest.n_trees() != header.n_trees as usize {
        return Err(DeserializeError::CorruptPayload(format!(
            "header declares {} trees, payload holds {}",
            header.n_trees,
            forest.n_trees()
        )));
    }
    if forest.n_features() != header.n_features as usize {
        return Err(DeserializeError::CorruptPayload(format!(
            "header declares {} features, payload has {}",
            header.n_features,
            forest.n_features()
        )));
    }
    forest
        .validate()
        .map_err(|e| DeserializeError::CorruptPayload(e.to_string()))?;
    if header.flags.contains(FormatFlags::HAS_TRAINING_DATA) != payload.training_data.is_some() {
        return Err(DeserializeError::CorruptPayload(
            "training data flag disagrees with payload".into(),
        ));
    }
    if let Some(data) = &payload.training_data {
        data.validate()
            .map_err(|e| DeserializeError::CorruptPayload(format!("training data: {e}")))?;
    }

    Ok(SavedForest {
        forest,
        training_data: payload.training_data,
    })
}

// ============================================================================
// Bytes and files
// ============================================================================

pub fn serialize_forest<T: TreeOracle + Serialize>(
    forest: &Forest<T>,
    training_data: Option<&TrainingData>,
) -> Result<Vec<u8>, SerializeError> {
    let mut out = Vec::new();
    write_forest(&mut out, forest, training_data)?;
    Ok(out)
}

pub fn deserialize_forest<T: TreeOracle + DeserializeOwned>(bytes: &[u8]) -> Result<SavedForest<T>, DeserializeError> {
    read_forest(&mut &bytes[..])
}

/// Save to `path`, creating or truncating the file.
pub fn save_to_file<T: TreeOracle + Serialize>(
    path: impl AsRef<Path>,
    forest: &Forest<T>,
    training_data: Option<&TrainingData>,
) -> Result<(), SerializeError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_forest(&mut writer, forest, training_data)?;
    writer.flush()?;
    Ok(())
}

pub fn load_from_file<T: TreeOracle + DeserializeOwned>(path: impl AsRef<Path>) -> Result<SavedForest<T>, DeserializeError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    read_forest(&mut reader)
}
