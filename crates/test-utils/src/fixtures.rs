//! Synthetic OMPS-LP granule contents.
//!
//! [`LimbFixture`] holds every field of a Level-2 limb profile file with the
//! native types the instrument products use. The default contents are a
//! clean granule: no particulate flag, good quality codes, a valid swath
//! flag and no reported cloud height, so nothing gets masked until a test
//! changes a field.

use std::collections::HashSet;

use ndarray::{Array1, Array2};

use crate::generators::{
    create_altitude_grid, create_ozone_profiles, create_pressure_profiles,
    create_temperature_profiles,
};

/// Group and field names of the Level-2 limb profile product.
///
/// Mirrors `omps_limb_parser::native::names`, which checks the two lists
/// against each other in its tests.
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

/// Date written for every scan by default (2020-06-15).
pub const DEFAULT_DATE: i32 = 20200615;

/// Swath flag whose third digit is zero (scan valid).
pub const VALID_SWATH_FLAG: i32 = 10000;

/// Swath flag whose third digit is nonzero (scan invalid).
pub const INVALID_SWATH_FLAG: i32 = 10100;

/// Cloud height value meaning "no cloud height reported".
pub const NO_CLOUD_HEIGHT: f32 = 1.0;

/// Contents of a synthetic limb profile granule.
#[derive(Debug, Clone)]
pub struct LimbFixture {
    pub date: Array1<i32>,
    pub time: Array1<f64>,
    pub latitude: Array1<f32>,
    pub longitude: Array1<f32>,
    pub swath_flags: Array1<i32>,
    pub temperature: Array2<f32>,
    pub pressure: Array2<f32>,
    pub altitude: Array1<f32>,
    pub o3_vis: Array2<f32>,
    pub o3_vis_precision: Array2<f32>,
    pub o3_uv: Array2<f32>,
    pub o3_uv_precision: Array2<f32>,
    pub pmc_flag: Array1<i8>,
    pub cloud_height: Array1<f32>,
    pub vis_quality: Array1<i32>,
    pub uv_quality: Array1<i32>,
    omitted: HashSet<(String, String)>,
}

impl LimbFixture {
    /// Clean granule with `scans` along-track positions and `levels` altitudes.
    ///
    /// Altitudes are `0, 1, .., levels - 1`; scan `i` is observed at
    /// `i * 60 + 1` seconds past midnight.
    pub fn new(scans: usize, levels: usize) -> Self {
        Self {
            date: Array1::from_elem(scans, DEFAULT_DATE),
            time: Array1::from_shape_fn(scans, |i| i as f64 * 60.0 + 1.0),
            latitude: Array1::from_shape_fn(scans, |i| -60.0 + i as f32 * 5.0),
            longitude: Array1::from_shape_fn(scans, |i| 100.0 + i as f32 * 0.5),
            swath_flags: Array1::from_elem(scans, VALID_SWATH_FLAG),
            temperature: create_temperature_profiles(scans, levels),
            pressure: create_pressure_profiles(scans, levels),
            altitude: create_altitude_grid(levels),
            o3_vis: create_ozone_profiles(scans, levels, 1.0),
            o3_vis_precision: create_ozone_profiles(scans, levels, 0.05),
            o3_uv: create_ozone_profiles(scans, levels, 1.1),
            o3_uv_precision: create_ozone_profiles(scans, levels, 0.07),
            pmc_flag: Array1::zeros(scans),
            cloud_height: Array1::from_elem(scans, NO_CLOUD_HEIGHT),
            vis_quality: Array1::ones(scans),
            uv_quality: Array1::ones(scans),
            omitted: HashSet::new(),
        }
    }

    pub fn scans(&self) -> usize {
        self.date.len()
    }

    pub fn levels(&self) -> usize {
        self.altitude.len()
    }

    /// Leave `group/field` out when the fixture is written.
    pub fn without_field(mut self, group: &str, field: &str) -> Self {
        self.omitted.insert((group.to_string(), field.to_string()));
        self
    }

    pub fn is_omitted(&self, group: &str, field: &str) -> bool {
        self.omitted
            .contains(&(group.to_string(), field.to_string()))
    }

    /// Expected number density for a sample with no mask applied.
    pub fn expected_density(&self, raw: &Array2<f32>, scan: usize, level: usize) -> f64 {
        let v = raw[[scan, level]] as f64;
        let t = self.temperature[[scan, level]] as f64;
        let p = self.pressure[[scan, level]] as f64;
        v * 1.38e-19 * t / p / 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shapes() {
        let fx = LimbFixture::new(4, 5);
        assert_eq!(fx.scans(), 4);
        assert_eq!(fx.levels(), 5);
        assert_eq!(fx.o3_vis.dim(), (4, 5));
        assert_eq!(fx.pressure.dim(), (4, 5));
        assert_eq!(fx.altitude.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fixture_is_clean() {
        let fx = LimbFixture::new(3, 3);
        assert!(fx.pmc_flag.iter().all(|&f| f == 0));
        assert!(fx.vis_quality.iter().all(|&q| q == 1));
        assert!(fx.cloud_height.iter().all(|&c| c == NO_CLOUD_HEIGHT));
        assert_eq!(VALID_SWATH_FLAG.to_string().chars().nth(2), Some('0'));
        assert_ne!(INVALID_SWATH_FLAG.to_string().chars().nth(2), Some('0'));
    }

    #[test]
    fn test_without_field() {
        let fx = LimbFixture::new(1, 1).without_field(names::DATA, names::CLOUD_HEIGHT);
        assert!(fx.is_omitted("DataFields", "CloudHeight"));
        assert!(!fx.is_omitted("DataFields", "Altitude"));
    }
}
