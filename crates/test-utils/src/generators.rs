//! Synthetic profile generators and the HDF5 fixture writer.
//!
//! Values are smooth and strictly positive so unit conversion never divides
//! by zero, and neighbouring scans/levels differ so misaligned reads are visible.

use std::path::Path;

use hdf5::H5Type;
use ndarray::{Array1, Array2, ArrayView, Dimension};

use crate::fixtures::{names, LimbFixture};

/// Altitude grid `0, 1, .., levels - 1` (km).
pub fn create_altitude_grid(levels: usize) -> Array1<f32> {
    Array1::from_shape_fn(levels, |l| l as f32)
}

/// Temperature in Kelvin, cooling with altitude and warming along track.
pub fn create_temperature_profiles(scans: usize, levels: usize) -> Array2<f32> {
    Array2::from_shape_fn((scans, levels), |(i, l)| {
        250.0 + i as f32 * 0.5 - l as f32 * 1.5
    })
}

/// Pressure decreasing with altitude; never zero.
pub fn create_pressure_profiles(scans: usize, levels: usize) -> Array2<f32> {
    Array2::from_shape_fn((scans, levels), |(i, l)| {
        1000.0 / (1.0 + l as f32) + i as f32 * 0.25
    })
}

/// Ozone-like values scaled by `scale`, increasing with altitude and along track.
pub fn create_ozone_profiles(scans: usize, levels: usize, scale: f32) -> Array2<f32> {
    Array2::from_shape_fn((scans, levels), |(i, l)| {
        scale * (1.0 + l as f32 * 0.25 + i as f32 * 0.125)
    })
}

/// Write `fixture` as an HDF5 file at `path`, replacing any existing file.
///
/// Fields marked with [`LimbFixture::without_field`] are left out; their
/// group is still created.
pub fn write_limb_fixture(path: &Path, fixture: &LimbFixture) -> hdf5::Result<()> {
    let file = hdf5::File::create(path)?;

    let geo = file.create_group(names::GEOLOCATION)?;
    write_field(&geo, fixture, names::GEOLOCATION, names::DATE, fixture.date.view())?;
    write_field(&geo, fixture, names::GEOLOCATION, names::TIME, fixture.time.view())?;
    write_field(&geo, fixture, names::GEOLOCATION, names::LATITUDE, fixture.latitude.view())?;
    write_field(&geo, fixture, names::GEOLOCATION, names::LONGITUDE, fixture.longitude.view())?;
    write_field(
        &geo,
        fixture,
        names::GEOLOCATION,
        names::SWATH_FLAGS,
        fixture.swath_flags.view(),
    )?;

    let anc = file.create_group(names::ANCILLARY)?;
    write_field(&anc, fixture, names::ANCILLARY, names::TEMPERATURE, fixture.temperature.view())?;
    write_field(&anc, fixture, names::ANCILLARY, names::PRESSURE, fixture.pressure.view())?;

    let data = file.create_group(names::DATA)?;
    write_field(&data, fixture, names::DATA, names::ALTITUDE, fixture.altitude.view())?;
    write_field(&data, fixture, names::DATA, names::O3_VIS, fixture.o3_vis.view())?;
    write_field(
        &data,
        fixture,
        names::DATA,
        names::O3_VIS_PRECISION,
        fixture.o3_vis_precision.view(),
    )?;
    write_field(&data, fixture, names::DATA, names::O3_UV, fixture.o3_uv.view())?;
    write_field(
        &data,
        fixture,
        names::DATA,
        names::O3_UV_PRECISION,
        fixture.o3_uv_precision.view(),
    )?;
    write_field(&data, fixture, names::DATA, names::PMC_FLAG, fixture.pmc_flag.view())?;
    write_field(&data, fixture, names::DATA, names::CLOUD_HEIGHT, fixture.cloud_height.view())?;
    write_field(&data, fixture, names::DATA, names::VIS_QUALITY, fixture.vis_quality.view())?;
    write_field(&data, fixture, names::DATA, names::UV_QUALITY, fixture.uv_quality.view())?;

    // HDF5 flushes and closes the file once its last handle is dropped
    drop(file);
    Ok(())
}

fn write_field<T: H5Type, D: Dimension>(
    group: &hdf5::Group,
    fixture: &LimbFixture,
    group_name: &str,
    name: &str,
    values: ArrayView<'_, T, D>,
) -> hdf5::Result<()> {
    if fixture.is_omitted(group_name, name) {
        return Ok(());
    }
    group.new_dataset_builder().with_data(values).create(name)?;
    Ok(())
}
