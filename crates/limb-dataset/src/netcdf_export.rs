//! NetCDF-4 export of a [`LabeledDataset`].
//!
//! Coordinates become variables over their dimension; timestamps are stored
//! as `f64` seconds since the Unix epoch with a CF `units` attribute. When the
//! dataset carries a numeric `missing_value` attribute it is applied to every
//! data variable as both `missing_value` and `_FillValue`.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::dataset::{AttributeValue, CoordinateValues, LabeledDataset};
use crate::error::{DatasetError, DatasetResult};

/// CF time units for exported timestamps.
pub const TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00";

impl LabeledDataset {
    /// Write the dataset to a new NetCDF file, replacing any existing file.
    pub fn write_netcdf<P: AsRef<Path>>(&self, path: P) -> DatasetResult<()> {
        let path = path.as_ref();
        let mut nc = netcdf::create(path).map_err(|e| {
            DatasetError::NetCdf(format!("Failed to create {}: {}", path.display(), e))
        })?;

        for (name, len) in self.dims() {
            nc.add_dimension(name, *len).map_err(nc_err)?;
        }

        for (name, coord) in self.coords() {
            let mut var = nc
                .add_variable::<f64>(name, &[coord.dim()])
                .map_err(nc_err)?;
            match coord.values() {
                CoordinateValues::Float(values) => {
                    var.put_values(values, ..).map_err(nc_err)?;
                }
                CoordinateValues::Time(values) => {
                    var.put_attribute("units", TIME_UNITS).map_err(nc_err)?;
                    var.put_attribute("calendar", "standard").map_err(nc_err)?;
                    let seconds: Vec<f64> = values.iter().map(epoch_seconds).collect();
                    var.put_values(&seconds, ..).map_err(nc_err)?;
                }
            }
            debug!(name = name, dim = coord.dim(), "Wrote coordinate");
        }

        let missing_value = self.attr("missing_value").and_then(|a| a.as_number());

        for (name, data_var) in self.data_vars() {
            let dims: Vec<&str> = data_var.dims().iter().map(String::as_str).collect();
            let mut var = nc.add_variable::<f64>(name, &dims).map_err(nc_err)?;
            if let Some(fill) = missing_value {
                var.set_fill_value(fill).map_err(nc_err)?;
                var.put_attribute("missing_value", fill).map_err(nc_err)?;
            }
            let coordinates = self.coordinates_for(&dims);
            if !coordinates.is_empty() {
                var.put_attribute("coordinates", coordinates.as_str())
                    .map_err(nc_err)?;
            }
            let values: Vec<f64> = data_var.values().iter().copied().collect();
            var.put_values(&values, ..).map_err(nc_err)?;
            debug!(name = name, dims = ?dims, "Wrote data variable");
        }

        for (name, value) in self.attrs() {
            let written = match value {
                AttributeValue::Number(n) => nc.add_attribute(name, *n),
                AttributeValue::Text(s) => nc.add_attribute(name, s.as_str()),
            };
            written.map_err(nc_err)?;
        }

        info!(
            path = %path.display(),
            dims = ?self.dims(),
            "Exported dataset to NetCDF"
        );
        Ok(())
    }

    /// Space-separated names of the coordinates indexed by any of `dims`.
    fn coordinates_for(&self, dims: &[&str]) -> String {
        self.coords()
            .filter(|(_, c)| dims.contains(&c.dim()))
            .map(|(name, _)| name)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn epoch_seconds(t: &DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) * 1e-9
}

fn nc_err(e: netcdf::Error) -> DatasetError {
    DatasetError::NetCdf(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_epoch_seconds() {
        let t = Utc.with_ymd_and_hms(1970, 1, 1, 0, 1, 1).unwrap();
        assert_eq!(epoch_seconds(&t), 61.0);

        let t = t + chrono::Duration::milliseconds(500);
        assert_eq!(epoch_seconds(&t), 61.5);
    }
}
