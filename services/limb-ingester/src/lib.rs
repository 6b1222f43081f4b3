//! OMPS limb profile ingester.
//!
//! Reads Level-2 limb ozone granules through `omps-limb-parser` and either
//! summarizes them or exports them to NetCDF, processing files in parallel.

pub mod config;
pub mod ingest;
pub mod logging;

pub use config::{IngesterConfig, LogFormat, LoggingConfig};
pub use ingest::{
    collect_inputs, convert_file, format_record, hdf5_access, inspect_file, load_granule,
    output_path, BatchReport, FileOutcome, IngestionPipeline, InspectRecord, HDF5_EXTENSIONS,
};
pub use logging::init_tracing;
