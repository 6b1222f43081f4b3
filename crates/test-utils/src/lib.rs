//! Shared test utilities for the omps-limb workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Test data path helpers
//! - Skip macros for optional real granules
//! - Synthetic OMPS-LP granules written as HDF5 files
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{write_limb_fixture, LimbFixture};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro to skip a test if the required file is not found.
///
/// Real granules are not part of the repository. Point `TEST_DATA_DIR` at a
/// directory holding them to enable the tests that use this macro.
///
/// ```ignore
/// use test_utils::require_test_file;
///
/// #[test]
/// fn test_real_granule() {
///     let path = require_test_file!("OMPS-NPP_LP-L2-O3-DAILY_v2.5_2020m0615.h5");
///     // Test code using path...
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Set TEST_DATA_DIR to a directory containing it.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Macro for approximate floating-point equality assertions.
///
/// The tolerance is relative to the magnitude of `right`, so it works for
/// number densities around 1e17 as well as for values near 1.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon * right.abs().max(1.0) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that every value of a profile equals the missing-value sentinel.
///
/// ```ignore
/// use test_utils::assert_all_missing;
///
/// assert_all_missing!(o3_vis.row(2), -999.0);
/// ```
#[macro_export]
macro_rules! assert_all_missing {
    ($profile:expr, $missing:expr) => {{
        let missing: f64 = $missing as f64;
        for (level, value) in $profile.iter().enumerate() {
            if *value as f64 != missing {
                panic!(
                    "assertion failed: level {} holds {:?}, expected missing value {:?}",
                    level, value, missing
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(3.0e17 * (1.0 + 1e-9), 3.0e17, 1e-6);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_all_missing_passes() {
        let profile = array![-999.0, -999.0, -999.0];
        assert_all_missing!(profile, -999.0);
    }

    #[test]
    #[should_panic(expected = "level 1 holds")]
    fn test_assert_all_missing_fails() {
        let profile = array![-999.0, 4.0];
        assert_all_missing!(profile, -999.0);
    }
}
