//! Content-based deduplication of configuration or instance rows.
//!
//! Two rows are equal only if every coordinate has the same bit pattern:
//! `0.0` and `-0.0` are distinct, and NaNs with equal payloads match.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView2};

/// Unique rows in first-seen order plus the mapping from original rows.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueRows {
    /// Unique rows, in the order they were first seen.
    pub rows: Array2<f64>,
    /// For every original row, the index of its representative in `rows`.
    pub mapping: Vec<usize>,
}

impl UniqueRows {
    /// Number of unique rows.
    #[inline]
    pub fn n_unique(&self) -> usize {
        self.rows.nrows()
    }

    /// Rebuild the original matrix through the mapping.
    pub fn expand(&self) -> Array2<f64> {
        self.rows.select(ndarray::Axis(0), &self.mapping)
    }
}

/// Collapse repeated rows of `rows`.
///
/// The input is not modified.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use surrogate_forest::data::dedup_rows;
///
/// let rows = array![[1.0, 2.0], [3.0, 4.0], [1.0, 2.0]];
/// let unique = dedup_rows(rows.view());
/// assert_eq!(unique.rows, array![[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(unique.mapping, vec![0, 1, 0]);
/// ```
pub fn dedup_rows(rows: ArrayView2<'_, f64>) -> UniqueRows {
    let mut seen: HashMap<Vec<u64>, usize> = HashMap::with_capacity(rows.nrows());
    let mut first_rows = Vec::new();
    let mut mapping = Vec::with_capacity(rows.nrows());

    for (row_idx, row) in rows.outer_iter().enumerate() {
        let key: Vec<u64> = row.iter().map(|v| v.to_bits()).collect();
        let next = seen.len();
        let unique_idx = *seen.entry(key).or_insert_with(|| {
            first_rows.push(row_idx);
            next
        });
        mapping.push(unique_idx);
    }

    UniqueRows {
        rows: rows.select(ndarray::Axis(0), &first_rows),
        mapping,
    }
}
