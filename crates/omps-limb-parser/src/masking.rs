//! Quality masking of ozone profiles.
//!
//! Four independent rules overwrite unreliable samples with [`MISSING_VALUE`]:
//!
//! 1. particulate (PMC) contamination: both channels, whole profile
//! 2. per-channel retrieval quality: the failing channel, whole profile
//! 3. swath-level quality flag: both channels, whole profile
//! 4. cloud height: both channels, from the lowest level up to and
//!    including the level whose altitude equals the cloud height
//!
//! Each rule only ever writes the sentinel, so applying them in any order
//! yields the same profile and no rule can restore a masked sample.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

use crate::error::{LimbError, LimbResult};
use crate::native::RawLimbFields;

/// Sentinel written in place of an unreliable retrieval.
pub const MISSING_VALUE: f64 = -999.0;

/// `CloudHeight` value meaning no cloud height was reported.
pub const NO_CLOUD_HEIGHT: f64 = 1.0;

/// Quality-related fields of one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanFlags {
    pub pmc_flag: i64,
    pub vis_quality: i64,
    pub uv_quality: i64,
    pub swath_flag: i64,
    pub cloud_height: f64,
}

impl ScanFlags {
    /// Collect the per-scan quality fields of a granule.
    pub fn from_raw(raw: &RawLimbFields) -> Vec<ScanFlags> {
        (0..raw.scans())
            .map(|i| ScanFlags {
                pmc_flag: raw.pmc_flag[i],
                vis_quality: raw.vis_quality[i],
                uv_quality: raw.uv_quality[i],
                swath_flag: raw.swath_flags[i],
                cloud_height: raw.cloud_height[i],
            })
            .collect()
    }
}

/// Portion of a profile to overwrite with the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileMask {
    Keep,
    /// Levels `0..=n`
    ThroughLevel(usize),
    Full,
}

impl ProfileMask {
    /// Union of two masks.
    pub fn combine(self, other: ProfileMask) -> ProfileMask {
        use ProfileMask::*;
        match (self, other) {
            (Full, _) | (_, Full) => Full,
            (ThroughLevel(a), ThroughLevel(b)) => ThroughLevel(a.max(b)),
            (ThroughLevel(a), Keep) | (Keep, ThroughLevel(a)) => ThroughLevel(a),
            (Keep, Keep) => Keep,
        }
    }

    pub fn apply(self, mut profile: ArrayViewMut1<'_, f64>) {
        match self {
            ProfileMask::Keep => {}
            ProfileMask::Full => profile.fill(MISSING_VALUE),
            ProfileMask::ThroughLevel(level) => {
                let end = (level + 1).min(profile.len());
                profile
                    .slice_axis_mut(Axis(0), (0..end).into())
                    .fill(MISSING_VALUE);
            }
        }
    }
}

/// Masks for the visible and UV channel of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanMasks {
    pub vis: ProfileMask,
    pub uv: ProfileMask,
    pub pmc: bool,
    pub vis_quality: bool,
    pub uv_quality: bool,
    pub swath: bool,
    pub cloud_level: Option<usize>,
}

impl ScanMasks {
    /// Evaluate every rule for one scan.
    ///
    /// `scan` is only used to identify the scan in error messages.
    pub fn evaluate(scan: usize, flags: &ScanFlags, altitude: ArrayView1<'_, f64>) -> LimbResult<Self> {
        let pmc = flags.pmc_flag == 1;
        let vis_quality = flags.vis_quality != 1;
        let uv_quality = flags.uv_quality != 1;
        let swath = swath_flag_invalid(flags.swath_flag).ok_or_else(|| {
            LimbError::InvalidFormat(format!(
                "SwathLevelQualityFlags at scan {}: {} has no third digit",
                scan, flags.swath_flag
            ))
        })?;
        let cloud_level = cloud_top_level(flags.cloud_height, altitude);

        let full = |hit: bool| if hit { ProfileMask::Full } else { ProfileMask::Keep };
        let cloud = cloud_level.map_or(ProfileMask::Keep, ProfileMask::ThroughLevel);

        let vis = full(pmc)
            .combine(full(vis_quality))
            .combine(full(swath))
            .combine(cloud);
        let uv = full(pmc)
            .combine(full(uv_quality))
            .combine(full(swath))
            .combine(cloud);

        Ok(Self {
            vis,
            uv,
            pmc,
            vis_quality,
            uv_quality,
            swath,
            cloud_level,
        })
    }
}

/// Whether a swath flag marks its scan invalid.
///
/// The flag is read as decimal text; a character other than `'0'` at
/// position 2 means invalid. Returns `None` if the text is too short.
pub fn swath_flag_invalid(flag: i64) -> Option<bool> {
    flag.to_string().chars().nth(2).map(|c| c != '0')
}

/// Index of the first altitude exactly equal to `cloud_height`.
///
/// Returns `None` when nothing matches or the height is [`NO_CLOUD_HEIGHT`].
pub fn cloud_top_level(cloud_height: f64, altitude: ArrayView1<'_, f64>) -> Option<usize> {
    if cloud_height == NO_CLOUD_HEIGHT {
        return None;
    }
    altitude.iter().position(|&a| a == cloud_height)
}

/// Mask one scan's visible and UV profiles.
pub fn mask_scan_profiles(
    vis: ArrayView1<'_, f64>,
    uv: ArrayView1<'_, f64>,
    masks: &ScanMasks,
) -> (Array1<f64>, Array1<f64>) {
    let mut vis = vis.to_owned();
    let mut uv = uv.to_owned();
    masks.vis.apply(vis.view_mut());
    masks.uv.apply(uv.view_mut());
    (vis, uv)
}

/// Scans hit by each rule, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskCounts {
    pub pmc: usize,
    pub vis_quality: usize,
    pub uv_quality: usize,
    pub swath: usize,
    pub cloud: usize,
}

impl MaskCounts {
    fn record(&mut self, masks: &ScanMasks) {
        self.pmc += masks.pmc as usize;
        self.vis_quality += masks.vis_quality as usize;
        self.uv_quality += masks.uv_quality as usize;
        self.swath += masks.swath as usize;
        self.cloud += masks.cloud_level.is_some() as usize;
    }
}

/// Masked visible and UV ozone arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedProfiles {
    pub o3_vis: Array2<f64>,
    pub o3_uv: Array2<f64>,
    pub counts: MaskCounts,
}

/// Apply every quality rule to all scans.
///
/// `flags` holds one entry per row of the ozone arrays.
pub fn apply_quality_masks(
    o3_vis: ArrayView2<'_, f64>,
    o3_uv: ArrayView2<'_, f64>,
    flags: &[ScanFlags],
    altitude: ArrayView1<'_, f64>,
) -> LimbResult<MaskedProfiles> {
    let expected = vec![flags.len(), altitude.len()];
    for (field, array) in [("o3_vis", &o3_vis), ("o3_uv", &o3_uv)] {
        if array.shape() != expected.as_slice() {
            return Err(LimbError::ShapeMismatch {
                field: field.to_string(),
                expected: expected.clone(),
                found: array.shape().to_vec(),
            });
        }
    }

    let mut out_vis = o3_vis.to_owned();
    let mut out_uv = o3_uv.to_owned();
    let mut counts = MaskCounts::default();

    for (scan, scan_flags) in flags.iter().enumerate() {
        let masks = ScanMasks::evaluate(scan, scan_flags, altitude)?;
        counts.record(&masks);

        let (vis, uv) = mask_scan_profiles(o3_vis.row(scan), o3_uv.row(scan), &masks);
        out_vis.row_mut(scan).assign(&vis);
        out_uv.row_mut(scan).assign(&uv);
    }

    Ok(MaskedProfiles {
        o3_vis: out_vis,
        o3_uv: out_uv,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn clean() -> ScanFlags {
        ScanFlags {
            pmc_flag: 0,
            vis_quality: 1,
            uv_quality: 1,
            swath_flag: 10000,
            cloud_height: NO_CLOUD_HEIGHT,
        }
    }

    fn altitude() -> Array1<f64> {
        array![0.0, 1.0, 2.0, 3.0, 4.0]
    }

    #[test]
    fn test_swath_flag_digit() {
        assert_eq!(swath_flag_invalid(10000), Some(false));
        assert_eq!(swath_flag_invalid(10100), Some(true));
        assert_eq!(swath_flag_invalid(99099), Some(false));
        assert_eq!(swath_flag_invalid(-105), Some(false));
        assert_eq!(swath_flag_invalid(42), None);
    }

    #[test]
    fn test_cloud_top_level() {
        let alt = altitude();
        assert_eq!(cloud_top_level(2.0, alt.view()), Some(2));
        assert_eq!(cloud_top_level(2.5, alt.view()), None);
        assert_eq!(cloud_top_level(1.0, alt.view()), None);
        assert_eq!(cloud_top_level(f64::NAN, alt.view()), None);
    }

    #[test]
    fn test_cloud_top_level_takes_first_match() {
        let alt = array![0.0, 3.0, 3.0, 5.0];
        assert_eq!(cloud_top_level(3.0, alt.view()), Some(1));
    }

    #[test]
    fn test_combine_is_union() {
        use ProfileMask::*;
        assert_eq!(Keep.combine(Keep), Keep);
        assert_eq!(Keep.combine(ThroughLevel(2)), ThroughLevel(2));
        assert_eq!(ThroughLevel(3).combine(ThroughLevel(1)), ThroughLevel(3));
        assert_eq!(ThroughLevel(3).combine(Full), Full);
        assert_eq!(Full.combine(Keep), Full);
    }

    #[test]
    fn test_through_level_mask() {
        let mut profile = array![1.0, 2.0, 3.0, 4.0, 5.0];
        ProfileMask::ThroughLevel(2).apply(profile.view_mut());
        assert_eq!(profile, array![-999.0, -999.0, -999.0, 4.0, 5.0]);
    }

    #[test]
    fn test_clean_scan_untouched() {
        let masks = ScanMasks::evaluate(0, &clean(), altitude().view()).unwrap();
        assert_eq!(masks.vis, ProfileMask::Keep);
        assert_eq!(masks.uv, ProfileMask::Keep);
    }

    #[test]
    fn test_pmc_masks_both_channels() {
        let flags = ScanFlags {
            pmc_flag: 1,
            ..clean()
        };
        let masks = ScanMasks::evaluate(0, &flags, altitude().view()).unwrap();
        assert_eq!(masks.vis, ProfileMask::Full);
        assert_eq!(masks.uv, ProfileMask::Full);
    }

    #[test]
    fn test_channel_quality_is_independent() {
        let flags = ScanFlags {
            vis_quality: 0,
            ..clean()
        };
        let masks = ScanMasks::evaluate(0, &flags, altitude().view()).unwrap();
        assert_eq!(masks.vis, ProfileMask::Full);
        assert_eq!(masks.uv, ProfileMask::Keep);

        let flags = ScanFlags {
            uv_quality: 2,
            ..clean()
        };
        let masks = ScanMasks::evaluate(0, &flags, altitude().view()).unwrap();
        assert_eq!(masks.vis, ProfileMask::Keep);
        assert_eq!(masks.uv, ProfileMask::Full);
    }

    #[test]
    fn test_short_swath_flag_is_error() {
        let flags = ScanFlags {
            swath_flag: 7,
            ..clean()
        };
        let err = ScanMasks::evaluate(4, &flags, altitude().view()).unwrap_err();
        assert!(err.to_string().contains("scan 4"));
    }

    #[test]
    fn test_apply_quality_masks() {
        let o3 = Array2::from_elem((3, 5), 7.0);
        let flags = vec![
            clean(),
            ScanFlags {
                cloud_height: 2.0,
                ..clean()
            },
            ScanFlags {
                swath_flag: 10100,
                ..clean()
            },
        ];
        let out = apply_quality_masks(o3.view(), o3.view(), &flags, altitude().view()).unwrap();

        assert!(out.o3_vis.row(0).iter().all(|&v| v == 7.0));
        assert_eq!(out.o3_uv.row(1).to_vec(), vec![-999.0, -999.0, -999.0, 7.0, 7.0]);
        assert!(out.o3_vis.row(2).iter().all(|&v| v == MISSING_VALUE));
        assert_eq!(out.counts.cloud, 1);
        assert_eq!(out.counts.swath, 1);
        assert_eq!(out.counts.pmc, 0);
    }

    #[test]
    fn test_masks_never_restore_values() {
        let mut o3 = Array2::from_elem((1, 5), 7.0);
        o3[[0, 4]] = MISSING_VALUE;
        let flags = vec![ScanFlags {
            cloud_height: 1.0,
            ..clean()
        }];
        let out = apply_quality_masks(o3.view(), o3.view(), &flags, altitude().view()).unwrap();
        assert_eq!(out.o3_vis[[0, 4]], MISSING_VALUE);
    }

    #[test]
    fn test_flag_count_mismatch() {
        let o3 = Array2::from_elem((2, 5), 7.0);
        let err = apply_quality_masks(o3.view(), o3.view(), &[clean()], altitude().view())
            .unwrap_err();
        assert!(matches!(err, LimbError::ShapeMismatch { .. }));
    }
}
