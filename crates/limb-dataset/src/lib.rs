//! Labeled, coordinate-indexed datasets for satellite profile retrievals.
//!
//! This crate provides the container the OMPS limb parser fills in:
//! named dimensions, `f64` data variables over those dimensions, 1-D
//! coordinates (numeric or UTC timestamps) and global attributes. Shapes
//! are validated on insert.
//!
//! Besides construction and indexing it offers a serializable
//! [`DatasetSummary`] and NetCDF-4 export via [`LabeledDataset::write_netcdf`].

mod dataset;
pub mod error;
mod netcdf_export;
mod summary;

pub use dataset::{AttributeValue, Coordinate, CoordinateValues, LabeledDataset, Variable};
pub use error::{DatasetError, DatasetResult};
pub use netcdf_export::TIME_UNITS;
pub use summary::{DatasetSummary, VariableSummary};
