//! Native HDF5 reading of OMPS limb profile granules.
//!
//! Every field the loader needs is read eagerly into a [`RawLimbFields`]
//! struct and the file handle is released before any processing happens.
//! Presence of each group and field is checked explicitly so a missing
//! field is reported by name instead of as an opaque HDF5 failure.

use std::path::Path;
use std::sync::Once;

use hdf5::H5Type;
use ndarray::{Array, Array1, Array2, Dimension};
use tracing::debug;

use crate::error::{LimbError, LimbResult};

/// Group and field names of the Level-2 limb profile product.
pub mod names {
    pub const GEOLOCATION: &str = "GeolocationFields";
    pub const ANCILLARY: &str = "AncillaryData";
    pub const DATA: &str = "DataFields";

    pub const DATE: &str = "Date";
    pub const TIME: &str = "Time";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const SWATH_FLAGS: &str = "SwathLevelQualityFlags";
    pub const TEMPERATURE: &str = "Temperature";
    pub const PRESSURE: &str = "Pressure";
    pub const ALTITUDE: &str = "Altitude";
    pub const O3_VIS: &str = "O3VisValue";
    pub const O3_VIS_PRECISION: &str = "O3VisPrecision";
    pub const O3_UV: &str = "O3UvValue";
    pub const O3_UV_PRECISION: &str = "O3UvPrecision";
    pub const PMC_FLAG: &str = "ASI_PMCFlag";
    pub const CLOUD_HEIGHT: &str = "CloudHeight";
    pub const VIS_QUALITY: &str = "O3VisQuality";
    pub const UV_QUALITY: &str = "O3UvQuality";
}

/// All fields of one granule, as read from the file.
///
/// Per-scan fields have length `scans`; per-scan-per-level fields have shape
/// `(scans, levels)`; `altitude` has length `levels` and is shared by all
/// scans. Integer-coded fields are widened to `i64`, physical values to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLimbFields {
    pub date: Array1<i64>,
    pub time: Array1<f64>,
    pub latitude: Array1<f64>,
    pub longitude: Array1<f64>,
    pub swath_flags: Array1<i64>,
    pub temperature: Array2<f64>,
    pub pressure: Array2<f64>,
    pub altitude: Array1<f64>,
    pub o3_vis: Array2<f64>,
    pub o3_vis_precision: Array2<f64>,
    pub o3_uv: Array2<f64>,
    pub o3_uv_precision: Array2<f64>,
    pub pmc_flag: Array1<i64>,
    pub cloud_height: Array1<f64>,
    pub vis_quality: Array1<i64>,
    pub uv_quality: Array1<i64>,
}

impl RawLimbFields {
    /// Number of along-track scans (length of `Date`).
    pub fn scans(&self) -> usize {
        self.date.len()
    }

    /// Number of altitude levels (length of `Altitude`).
    pub fn levels(&self) -> usize {
        self.altitude.len()
    }

    /// Check that every field agrees with the scan and level counts.
    pub fn validate_shapes(&self) -> LimbResult<()> {
        use names::*;

        let per_scan = [self.scans()];
        let per_level = [self.scans(), self.levels()];

        check_shape(GEOLOCATION, TIME, self.time.shape(), &per_scan)?;
        check_shape(GEOLOCATION, LATITUDE, self.latitude.shape(), &per_scan)?;
        check_shape(GEOLOCATION, LONGITUDE, self.longitude.shape(), &per_scan)?;
        check_shape(GEOLOCATION, SWATH_FLAGS, self.swath_flags.shape(), &per_scan)?;
        check_shape(ANCILLARY, TEMPERATURE, self.temperature.shape(), &per_level)?;
        check_shape(ANCILLARY, PRESSURE, self.pressure.shape(), &per_level)?;
        check_shape(DATA, O3_VIS, self.o3_vis.shape(), &per_level)?;
        check_shape(DATA, O3_VIS_PRECISION, self.o3_vis_precision.shape(), &per_level)?;
        check_shape(DATA, O3_UV, self.o3_uv.shape(), &per_level)?;
        check_shape(DATA, O3_UV_PRECISION, self.o3_uv_precision.shape(), &per_level)?;
        check_shape(DATA, PMC_FLAG, self.pmc_flag.shape(), &per_scan)?;
        check_shape(DATA, CLOUD_HEIGHT, self.cloud_height.shape(), &per_scan)?;
        check_shape(DATA, VIS_QUALITY, self.vis_quality.shape(), &per_scan)?;
        check_shape(DATA, UV_QUALITY, self.uv_quality.shape(), &per_scan)?;
        Ok(())
    }
}

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose diagnostics to stderr even when errors
/// are handled by the Rust code (e.g. a probe for a field that is absent).
/// This disables that output by calling `H5Eset_auto2` with null handlers.
///
/// Call it early in `main()` before worker threads start touching HDF5. It
/// only runs once per process; later calls are no-ops.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Read every required field of a granule into memory.
///
/// The file handle (and every group handle) is dropped before shapes are
/// validated, on success and on every error path.
pub fn read_raw_fields<P: AsRef<Path>>(path: P) -> LimbResult<RawLimbFields> {
    silence_hdf5_errors();

    let path = path.as_ref();
    if !path.is_file() {
        return Err(LimbError::FileOpen {
            path: path.display().to_string(),
            message: "no such file".to_string(),
        });
    }

    let file = hdf5::File::open(path).map_err(|e| LimbError::FileOpen {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let raw = read_from_file(&file)?;
    drop(file);

    debug!(
        path = %path.display(),
        scans = raw.scans(),
        levels = raw.levels(),
        "Read OMPS limb fields"
    );

    raw.validate_shapes()?;
    Ok(raw)
}

fn read_from_file(file: &hdf5::File) -> LimbResult<RawLimbFields> {
    use names::*;

    let geo = open_group(file, GEOLOCATION)?;
    let anc = open_group(file, ANCILLARY)?;
    let data = open_group(file, DATA)?;

    Ok(RawLimbFields {
        date: read_field(&geo, GEOLOCATION, DATE)?,
        time: read_field(&geo, GEOLOCATION, TIME)?,
        latitude: read_field(&geo, GEOLOCATION, LATITUDE)?,
        longitude: read_field(&geo, GEOLOCATION, LONGITUDE)?,
        swath_flags: read_field(&geo, GEOLOCATION, SWATH_FLAGS)?,
        temperature: read_field(&anc, ANCILLARY, TEMPERATURE)?,
        pressure: read_field(&anc, ANCILLARY, PRESSURE)?,
        altitude: read_field(&data, DATA, ALTITUDE)?,
        o3_vis: read_field(&data, DATA, O3_VIS)?,
        o3_vis_precision: read_field(&data, DATA, O3_VIS_PRECISION)?,
        o3_uv: read_field(&data, DATA, O3_UV)?,
        o3_uv_precision: read_field(&data, DATA, O3_UV_PRECISION)?,
        pmc_flag: read_field(&data, DATA, PMC_FLAG)?,
        cloud_height: read_field(&data, DATA, CLOUD_HEIGHT)?,
        vis_quality: read_field(&data, DATA, VIS_QUALITY)?,
        uv_quality: read_field(&data, DATA, UV_QUALITY)?,
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

fn open_group(file: &hdf5::File, name: &str) -> LimbResult<hdf5::Group> {
    if !file.link_exists(name) {
        return Err(LimbError::MissingData(name.to_string()));
    }
    Ok(file.group(name)?)
}

/// Read `group/name` converting to `T`, requiring the dimensionality of `D`.
fn read_field<T: H5Type, D: Dimension>(
    group: &hdf5::Group,
    group_name: &str,
    name: &str,
) -> LimbResult<Array<T, D>> {
    if !group.link_exists(name) {
        return Err(LimbError::MissingData(format!("{}/{}", group_name, name)));
    }
    let dataset = group.dataset(name)?;
    let values = dataset.read_dyn::<T>()?;
    let ndim = values.ndim();

    values.into_dimensionality::<D>().map_err(|_| {
        LimbError::InvalidFormat(format!(
            "{}/{} has {} dimensions, expected {}",
            group_name,
            name,
            ndim,
            D::NDIM.unwrap_or(0)
        ))
    })
}

fn check_shape(group: &str, name: &str, found: &[usize], expected: &[usize]) -> LimbResult<()> {
    if found != expected {
        return Err(LimbError::ShapeMismatch {
            field: format!("{}/{}", group, name),
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }
    Ok(())
}
