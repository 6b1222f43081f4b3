//! Reader for OMPS Limb Profiler ozone retrievals (Level 2, HDF5).
//!
//! [`read_omps_limb`] turns one granule into a [`LabeledDataset`] with two
//! dimensions, `x` (along-track scan) and `z` (altitude level):
//!
//! | Name | Kind | Dims |
//! |------|------|------|
//! | `O3_UV`, `O3_vis` | data, masked number density | `x, z` |
//! | `precision_uv`, `precision_vis` | data, number density | `x, z` |
//! | `longitude`, `latitude`, `obs_time` | coordinate | `x` |
//! | `altitude` | coordinate | `z` |
//!
//! The dataset carries a `missing_value` attribute of `-999.0`.
//!
//! # Processing
//!
//! All fields are read and the file is closed first. The visible and UV
//! retrievals and their precisions are converted with
//! `value * 1.38e-19 * T / P / 1e-6`; observation times combine `Date`
//! (`YYYYMMDD`) with the `Time` seconds offset. The ozone values (not the
//! precisions) are then masked per scan: PMC flag, per-channel quality,
//! swath-level quality flag and cloud-height truncation. See [`masking`].

pub mod convert;
pub mod error;
pub mod masking;
pub mod native;

use std::path::Path;

use limb_dataset::{CoordinateValues, LabeledDataset};
use tracing::info;

pub use convert::{observation_times, scan_date, to_number_density};
pub use error::{LimbError, LimbResult};
pub use masking::{
    apply_quality_masks, mask_scan_profiles, MaskCounts, ProfileMask, ScanFlags, ScanMasks,
    MISSING_VALUE, NO_CLOUD_HEIGHT,
};
pub use native::{read_raw_fields, silence_hdf5_errors, RawLimbFields};

/// Along-track dimension.
pub const DIM_X: &str = "x";
/// Altitude-level dimension.
pub const DIM_Z: &str = "z";

pub const VAR_O3_UV: &str = "O3_UV";
pub const VAR_O3_VIS: &str = "O3_vis";
pub const VAR_PRECISION_UV: &str = "precision_uv";
pub const VAR_PRECISION_VIS: &str = "precision_vis";

pub const COORD_LONGITUDE: &str = "longitude";
pub const COORD_LATITUDE: &str = "latitude";
pub const COORD_OBS_TIME: &str = "obs_time";
pub const COORD_ALTITUDE: &str = "altitude";

/// Name of the global attribute holding [`MISSING_VALUE`].
pub const ATTR_MISSING_VALUE: &str = "missing_value";

/// Read an OMPS-LP Level-2 ozone granule into a labeled, masked dataset.
///
/// Fails if the file cannot be opened, a required field is missing, field
/// shapes disagree, or a date / swath flag cannot be decoded. No partial
/// dataset is returned.
pub fn read_omps_limb<P: AsRef<Path>>(path: P) -> LimbResult<LabeledDataset> {
    let path = path.as_ref();
    let raw = read_raw_fields(path)?;
    let dataset = build_dataset(&raw)?;

    info!(
        path = %path.display(),
        scans = raw.scans(),
        levels = raw.levels(),
        "Loaded OMPS limb profile granule"
    );
    Ok(dataset)
}

/// Convert, mask and label fields already read from a granule.
pub fn build_dataset(raw: &RawLimbFields) -> LimbResult<LabeledDataset> {
    raw.validate_shapes()?;

    let o3_vis = to_number_density(raw.o3_vis.view(), raw.temperature.view(), raw.pressure.view())?;
    let precision_vis = to_number_density(
        raw.o3_vis_precision.view(),
        raw.temperature.view(),
        raw.pressure.view(),
    )?;
    let o3_uv = to_number_density(raw.o3_uv.view(), raw.temperature.view(), raw.pressure.view())?;
    let precision_uv = to_number_density(
        raw.o3_uv_precision.view(),
        raw.temperature.view(),
        raw.pressure.view(),
    )?;

    let times = observation_times(raw.date.view(), raw.time.view())?;

    let flags = ScanFlags::from_raw(raw);
    let masked = apply_quality_masks(o3_vis.view(), o3_uv.view(), &flags, raw.altitude.view())?;

    info!(
        scans = raw.scans(),
        pmc = masked.counts.pmc,
        vis_quality = masked.counts.vis_quality,
        uv_quality = masked.counts.uv_quality,
        swath = masked.counts.swath,
        cloud = masked.counts.cloud,
        "Applied quality masks"
    );

    let mut ds = LabeledDataset::new();
    ds.add_dimension(DIM_X, raw.scans())?;
    ds.add_dimension(DIM_Z, raw.levels())?;

    ds.add_data_var(VAR_O3_UV, &[DIM_X, DIM_Z], masked.o3_uv.into_dyn())?;
    ds.add_data_var(VAR_O3_VIS, &[DIM_X, DIM_Z], masked.o3_vis.into_dyn())?;
    ds.add_data_var(VAR_PRECISION_UV, &[DIM_X, DIM_Z], precision_uv.into_dyn())?;
    ds.add_data_var(VAR_PRECISION_VIS, &[DIM_X, DIM_Z], precision_vis.into_dyn())?;

    ds.add_coord(
        COORD_LONGITUDE,
        DIM_X,
        CoordinateValues::Float(raw.longitude.to_vec()),
    )?;
    ds.add_coord(
        COORD_LATITUDE,
        DIM_X,
        CoordinateValues::Float(raw.latitude.to_vec()),
    )?;
    ds.add_coord(COORD_OBS_TIME, DIM_X, CoordinateValues::Time(times))?;
    ds.add_coord(
        COORD_ALTITUDE,
        DIM_Z,
        CoordinateValues::Float(raw.altitude.to_vec()),
    )?;

    ds.set_attr(ATTR_MISSING_VALUE, MISSING_VALUE);

    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ndarray::{Array1, Array2};

    fn raw(scans: usize, levels: usize) -> RawLimbFields {
        RawLimbFields {
            date: Array1::from_elem(scans, 20200615),
            time: Array1::from_shape_fn(scans, |i| 3661.0 + i as f64),
            latitude: Array1::from_shape_fn(scans, |i| i as f64),
            longitude: Array1::from_shape_fn(scans, |i| -(i as f64)),
            swath_flags: Array1::from_elem(scans, 10000),
            temperature: Array2::from_elem((scans, levels), 250.0),
            pressure: Array2::from_elem((scans, levels), 2.0),
            altitude: Array1::from_shape_fn(levels, |l| l as f64),
            o3_vis: Array2::from_elem((scans, levels), 3.0),
            o3_vis_precision: Array2::from_elem((scans, levels), 0.5),
            o3_uv: Array2::from_elem((scans, levels), 4.0),
            o3_uv_precision: Array2::from_elem((scans, levels), 0.25),
            pmc_flag: Array1::zeros(scans),
            cloud_height: Array1::ones(scans),
            vis_quality: Array1::ones(scans),
            uv_quality: Array1::ones(scans),
        }
    }

    #[test]
    fn test_build_dataset_layout() {
        let ds = build_dataset(&raw(3, 5)).unwrap();
        assert_eq!(ds.dim_len(DIM_X), Some(3));
        assert_eq!(ds.dim_len(DIM_Z), Some(5));
        for name in [VAR_O3_UV, VAR_O3_VIS, VAR_PRECISION_UV, VAR_PRECISION_VIS] {
            let var = ds.data_var(name).unwrap();
            assert_eq!(var.dims(), &["x".to_string(), "z".to_string()]);
        }
        assert_eq!(ds.coord(COORD_ALTITUDE).unwrap().dim(), DIM_Z);
        assert_eq!(ds.coord(COORD_OBS_TIME).unwrap().dim(), DIM_X);
        assert_eq!(
            ds.attr(ATTR_MISSING_VALUE).and_then(|a| a.as_number()),
            Some(-999.0)
        );
    }

    #[test]
    fn test_build_dataset_values() {
        let ds = build_dataset(&raw(2, 3)).unwrap();
        let o3_vis = ds.var_2d(VAR_O3_VIS).unwrap();
        assert_eq!(o3_vis[[1, 2]], 3.0 * 1.38e-19 * 250.0 / 2.0 / 1e-6);
        let times = ds.time_coord(COORD_OBS_TIME).unwrap();
        assert_eq!(times[0], Utc.with_ymd_and_hms(2020, 6, 15, 1, 1, 1).unwrap());
        assert_eq!(times[1], Utc.with_ymd_and_hms(2020, 6, 15, 1, 1, 2).unwrap());
    }

    #[test]
    fn test_precision_is_not_masked() {
        let mut fields = raw(1, 3);
        fields.pmc_flag[0] = 1;
        let ds = build_dataset(&fields).unwrap();
        assert!(ds.var_2d(VAR_O3_UV).unwrap().iter().all(|&v| v == MISSING_VALUE));
        assert!(ds
            .var_2d(VAR_PRECISION_UV)
            .unwrap()
            .iter()
            .all(|&v| v != MISSING_VALUE));
    }

    #[test]
    fn test_empty_granule() {
        let ds = build_dataset(&raw(0, 4)).unwrap();
        assert_eq!(ds.dim_len(DIM_X), Some(0));
        assert_eq!(ds.var_2d(VAR_O3_VIS).unwrap().dim(), (0, 4));
    }
}
