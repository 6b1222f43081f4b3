//! Error types for OMPS limb profile parsing.

use limb_dataset::DatasetError;
use thiserror::Error;

/// Result type for limb parser operations.
pub type LimbResult<T> = Result<T, LimbError>;

/// Error types for OMPS limb profile parsing.
#[derive(Error, Debug)]
pub enum LimbError {
    /// File missing, unreadable, or not an HDF5 container
    #[error("Failed to open {path}: {message}")]
    FileOpen { path: String, message: String },

    /// Missing required group or field, named as `Group/Field`
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Field shape disagrees with the scan/level counts of the granule
    #[error("Shape mismatch for {field}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        field: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// `Date` value not parseable as `YYYYMMDD`
    #[error("Invalid date at scan {scan}: {value}")]
    InvalidDate { scan: usize, value: i64 },

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// HDF5 library error while reading a field
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Output dataset could not be assembled
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}
