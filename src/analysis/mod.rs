//! # Repeatability analysis of matched objects
//!
//! Turns a [`GroupView`] into the per-object summary arrays used by the threshold checks,
//! the SRD metrics and the plots.
//!
//! ## Pipeline
//! -----------------
//! 1. **Good filter** ([`filters::good_filter`]): at least
//!    [`AnalysisParams::n_matches_required`] detections, no saturated/cosmic-ray/bad/edge
//!    flag, finite magnitudes.
//! 2. **Summary** ([`MatchSummary`]): for each good object, in ascending object id order,
//!    the mean magnitude, the RMS magnitude scatter, the median magnitude error and the
//!    positional scatter in milliarcseconds.
//! 3. **Safe filter** ([`filters::safe_filter`]) on the good objects: mean magnitude
//!    `<= good_mag_limit` and extendedness `< safe_max_extended`.
//!
//! An empty good set is not an error: the summary arrays are empty, the match count is zero,
//! and downstream checks report failure.
//!
//! ## Parameters
//! -----------------
//! [`AnalysisParams`] is built through [`AnalysisParamsBuilder`], which validates the values:
//!
//! ```rust, no_run
//! use validate_drp::analysis::AnalysisParams;
//!
//! let params = AnalysisParams::builder()
//!     .good_mag_limit(21.0)
//!     .build()
//!     .unwrap();
//! ```
use crate::catalog::Field;
use crate::constants::{
    Magnitude, MilliArcSec, MilliMag, DEFAULT_GOOD_MAG_LIMIT, MAG2MMAG, N_MATCHES_REQUIRED,
    SAFE_MAX_EXTENDED,
};
use crate::matching::group_view::{field_values, Group, GroupSet, GroupView};
use crate::validate_errors::ValidateError;

pub mod filters;
pub mod stats;

use filters::{good_filter, safe_filter};
use stats::{mean, median, position_rms, std};

/// Thresholds of the quality filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    /// Faintest mean magnitude kept by the safe filter (inclusive).
    pub good_mag_limit: Magnitude,
    /// Extendedness at and above which a detection is considered extended.
    pub safe_max_extended: f64,
    /// Minimum number of detections of a good object.
    pub n_matches_required: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            good_mag_limit: DEFAULT_GOOD_MAG_LIMIT,
            safe_max_extended: SAFE_MAX_EXTENDED,
            n_matches_required: N_MATCHES_REQUIRED,
        }
    }
}

impl AnalysisParams {
    pub fn builder() -> AnalysisParamsBuilder {
        AnalysisParamsBuilder::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisParamsBuilder {
    params: AnalysisParams,
}

impl AnalysisParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: AnalysisParams::default(),
        }
    }

    pub fn good_mag_limit(mut self, v: Magnitude) -> Self {
        self.params.good_mag_limit = v;
        self
    }

    pub fn safe_max_extended(mut self, v: f64) -> Self {
        self.params.safe_max_extended = v;
        self
    }

    pub fn n_matches_required(mut self, v: usize) -> Self {
        self.params.n_matches_required = v;
        self
    }

    /// Validate and return the parameters.
    ///
    /// Return
    /// ------
    /// * `Err(InvalidParameter)` if a limit is not finite or fewer than 2 detections per
    ///   object are requested (a scatter needs two measurements)
    pub fn build(self) -> Result<AnalysisParams, ValidateError> {
        let p = &self.params;
        if !p.good_mag_limit.is_finite() {
            return Err(ValidateError::InvalidParameter(
                "good_mag_limit must be finite".into(),
            ));
        }
        if !p.safe_max_extended.is_finite() {
            return Err(ValidateError::InvalidParameter(
                "safe_max_extended must be finite".into(),
            ));
        }
        if p.n_matches_required < 2 {
            return Err(ValidateError::InvalidParameter(
                "n_matches_required must be >= 2".into(),
            ));
        }
        Ok(self.params)
    }
}

/// Positional scatter of the members of a group, in milliarcseconds.
pub fn group_position_rms(group: &Group) -> MilliArcSec {
    position_rms(
        &field_values(group, Field::Ra),
        &field_values(group, Field::Dec),
    )
}

/// Summary arrays of the good objects, aligned by index in ascending object id order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchSummary {
    /// Mean magnitude
    pub mag: Vec<Magnitude>,
    /// Median magnitude error
    pub magerr: Vec<Magnitude>,
    /// Magnitude RMS scatter
    pub magrms: Vec<Magnitude>,
    /// Positional scatter
    pub dist: Vec<MilliArcSec>,
    /// Number of good objects
    pub match_count: usize,
}

impl MatchSummary {
    pub fn from_groups(groups: &GroupView) -> Self {
        MatchSummary {
            mag: groups.aggregate_field(Field::PsfMag, mean),
            magerr: groups.aggregate_field(Field::PsfMagErr, median),
            magrms: groups.aggregate_field(Field::PsfMag, std),
            dist: groups.aggregate(group_position_rms),
            match_count: groups.number_of_groups(),
        }
    }

    pub fn len(&self) -> usize {
        self.mag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mag.is_empty()
    }

    /// Magnitude scatter in millimagnitudes.
    pub fn mmag_rms(&self) -> Vec<MilliMag> {
        self.magrms.iter().map(|v| v * MAG2MMAG).collect()
    }

    /// Median magnitude error in millimagnitudes.
    pub fn mmag_err(&self) -> Vec<MilliMag> {
        self.magerr.iter().map(|v| v * MAG2MMAG).collect()
    }
}

/// Filter the matched objects and compute their summary statistics.
///
/// Arguments
/// ---------
/// * `groups`: every matched object
/// * `params`: filter thresholds
///
/// Return
/// ------
/// * the [`MatchSummary`] of the good objects
/// * the good objects that also pass the safe filter
pub fn analyze_data(groups: &GroupView, params: &AnalysisParams) -> (MatchSummary, GroupView) {
    let good = good_filter(groups, params);
    let summary = MatchSummary::from_groups(&good);
    let safe = safe_filter(&good, params);

    tracing::info!(
        "{} matched objects, {} good, {} safe (mag <= {})",
        groups.number_of_groups(),
        good.number_of_groups(),
        safe.number_of_groups(),
        params.good_mag_limit
    );

    (summary, safe)
}

#[cfg(test)]
mod analysis_test {
    use super::*;
    use crate::catalog::{Detection, PixelFlags};
    use crate::constants::DataId;
    use approx::assert_relative_eq;
    use smallvec::smallvec;

    fn det(visit: u32, mag: f64) -> Detection {
        Detection::new(1, 1.0, 0.5, 1.0, 0.1, DataId::new(visit, 1)).with_magnitude(mag, 0.02)
    }

    #[test]
    fn test_builder_validation() {
        assert_eq!(AnalysisParams::builder().build(), Ok(AnalysisParams::default()));
        assert_eq!(
            AnalysisParams::builder().good_mag_limit(f64::NAN).build(),
            Err(ValidateError::InvalidParameter(
                "good_mag_limit must be finite".into()
            ))
        );
        assert!(AnalysisParams::builder().n_matches_required(1).build().is_err());
        assert!(AnalysisParams::builder()
            .safe_max_extended(f64::INFINITY)
            .build()
            .is_err());
    }

    #[test]
    fn test_analyze_reference_group() {
        let mut groups = GroupView::new();
        groups.insert(1, smallvec![det(1, 18.0), det(2, 18.2), det(3, 18.1)]);
        groups.insert(2, smallvec![det(1, 17.0)]);
        groups.insert(
            3,
            smallvec![
                det(1, 16.0),
                det(2, 16.1).with_flags(PixelFlags {
                    edge: true,
                    ..Default::default()
                })
            ],
        );
        groups.insert(4, smallvec![det(1, 20.0), det(2, 20.1)]);

        let params = AnalysisParams::default();
        let (summary, safe) = analyze_data(&groups, &params);

        assert_eq!(summary.match_count, 2);
        assert_eq!(summary.len(), 2);
        assert_relative_eq!(summary.mag[0], 18.1, epsilon = 1e-12);
        assert!(summary.magrms[0] > 0.0);
        assert_relative_eq!(summary.mmag_rms()[0], 1000.0 * summary.magrms[0]);
        assert_relative_eq!(summary.magerr[0], 0.02);
        assert_eq!(summary.dist[0], 0.0);

        // Object 4 is good but too faint for the safe set
        assert_eq!(safe.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_group_straddling_ra_zero() {
        let one_mas = crate::conversion::arcsec_to_rad(0.001);
        let group: Group = smallvec![
            Detection::new(1, std::f64::consts::TAU - one_mas, 0.0, 1.0, 0.1, DataId::new(1, 1)),
            Detection::new(7, one_mas, 0.0, 1.0, 0.1, DataId::new(2, 1)),
        ];
        assert_relative_eq!(group_position_rms(&group), 1.0, max_relative = 1e-5);
    }

    #[test]
    fn test_analyze_empty() {
        let (summary, safe) = analyze_data(&GroupView::new(), &AnalysisParams::default());
        assert!(summary.is_empty());
        assert_eq!(summary.match_count, 0);
        assert!(safe.is_empty());
    }
}
