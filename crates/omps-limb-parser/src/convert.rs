//! Unit conversion and observation time construction.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use ndarray::{Array2, ArrayView1, ArrayView2, Zip};

use crate::error::{LimbError, LimbResult};

/// Boltzmann constant as applied to the native retrieval units.
pub const BOLTZMANN_FACTOR: f64 = 1.38e-19;

/// Final divisor of the conversion (parts per million).
pub const PPMV_SCALE: f64 = 1e-6;

/// Convert native retrieval values to number density.
///
/// Elementwise `value * 1.38e-19 * temperature / pressure / 1e-6`, evaluated
/// left to right. The three arrays are combined positionally, with no
/// broadcasting: temperature and pressure must have the shape of `values`.
pub fn to_number_density(
    values: ArrayView2<'_, f64>,
    temperature: ArrayView2<'_, f64>,
    pressure: ArrayView2<'_, f64>,
) -> LimbResult<Array2<f64>> {
    for (field, other) in [("temperature", &temperature), ("pressure", &pressure)] {
        if other.shape() != values.shape() {
            return Err(LimbError::ShapeMismatch {
                field: field.to_string(),
                expected: values.shape().to_vec(),
                found: other.shape().to_vec(),
            });
        }
    }

    Ok(Zip::from(values)
        .and(temperature)
        .and(pressure)
        .map_collect(|&v, &t, &p| v * BOLTZMANN_FACTOR * t / p / PPMV_SCALE))
}

/// Parse an integer `YYYYMMDD` date.
pub fn scan_date(value: i64) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&value.to_string(), "%Y%m%d").ok()
}

/// Combine per-scan dates with seconds-of-day offsets into UTC timestamps.
///
/// Offsets are applied at nanosecond resolution and may exceed one day.
pub fn observation_times(
    dates: ArrayView1<'_, i64>,
    offsets: ArrayView1<'_, f64>,
) -> LimbResult<Vec<DateTime<Utc>>> {
    dates
        .iter()
        .zip(offsets.iter())
        .enumerate()
        .map(|(scan, (&date, &offset))| {
            let day = scan_date(date).ok_or(LimbError::InvalidDate { scan, value: date })?;
            let delta = offset_duration(offset).ok_or_else(|| {
                LimbError::InvalidFormat(format!("Time offset at scan {}: {}", scan, offset))
            })?;
            Ok(day.and_time(NaiveTime::MIN).and_utc() + delta)
        })
        .collect()
}

fn offset_duration(seconds: f64) -> Option<Duration> {
    let nanos = (seconds * 1e9).round();
    if !nanos.is_finite() || nanos.abs() > i64::MAX as f64 {
        return None;
    }
    Some(Duration::nanoseconds(nanos as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ndarray::array;

    #[test]
    fn test_conversion_formula() {
        let v = array![[2.0, 4.0]];
        let t = array![[250.0, 200.0]];
        let p = array![[0.5, 10.0]];
        let out = to_number_density(v.view(), t.view(), p.view()).unwrap();
        assert_eq!(out[[0, 0]], 2.0 * 1.38e-19 * 250.0 / 0.5 / 1e-6);
        assert_eq!(out[[0, 1]], 4.0 * 1.38e-19 * 200.0 / 10.0 / 1e-6);
    }

    #[test]
    fn test_conversion_rejects_broadcast() {
        let v = array![[1.0, 1.0], [1.0, 1.0]];
        let t = array![[250.0, 250.0]];
        let p = array![[1.0, 1.0], [1.0, 1.0]];
        let err = to_number_density(v.view(), t.view(), p.view()).unwrap_err();
        assert!(matches!(err, LimbError::ShapeMismatch { ref field, .. } if field == "temperature"));
    }

    #[test]
    fn test_scan_date() {
        assert_eq!(scan_date(20200615), NaiveDate::from_ymd_opt(2020, 6, 15));
        assert_eq!(scan_date(20200230), None);
        assert_eq!(scan_date(202006), None);
        assert_eq!(scan_date(-20200615), None);
    }

    #[test]
    fn test_observation_time() {
        let times = observation_times(array![20200615].view(), array![3661.0].view()).unwrap();
        assert_eq!(times, vec![Utc.with_ymd_and_hms(2020, 6, 15, 1, 1, 1).unwrap()]);
    }

    #[test]
    fn test_fractional_and_next_day_offsets() {
        let times =
            observation_times(array![20201231, 20201231].view(), array![0.25, 86400.0].view())
                .unwrap();
        let midnight = Utc.with_ymd_and_hms(2020, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(times[0], midnight + Duration::milliseconds(250));
        assert_eq!(times[1], Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_bad_date_reports_scan() {
        let err =
            observation_times(array![20200615, 20201301].view(), array![0.0, 0.0].view())
                .unwrap_err();
        assert!(matches!(err, LimbError::InvalidDate { scan: 1, value: 20201301 }));
    }

    #[test]
    fn test_non_finite_offset() {
        let err = observation_times(array![20200615].view(), array![f64::NAN].view()).unwrap_err();
        assert!(matches!(err, LimbError::InvalidFormat(_)));
    }
}
