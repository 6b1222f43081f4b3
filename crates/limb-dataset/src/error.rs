//! Error types for dataset construction and export.

use thiserror::Error;

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Error types for building or exporting a [`LabeledDataset`](crate::LabeledDataset).
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Array shape disagrees with the declared dimensions
    #[error("Shape mismatch for '{name}': expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Variable or coordinate references an undeclared dimension
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// Name already used by a dimension, variable or coordinate
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// NetCDF library error during export
    #[error("NetCDF export failed: {0}")]
    NetCdf(String),
}
