//! Astrometric repeatability: AM1 and AM2.
//!
//! For every pair of safe objects whose mean magnitudes lie in the requested range, the
//! angular separation between the two objects is measured independently on each visit where
//! both were detected. When the mean separation falls inside the annulus
//! `[D − width/2, D + width/2]`, the scatter (population standard deviation) of those
//! per-visit separations is recorded. AMx is the median of the recorded scatters.
//!
//! * AM1: `D = 5′`
//! * AM2: `D = 20′`
//!
//! Both use an annulus width of 2′ and the magnitude range `[17.5, 21.5]`.
use itertools::{EitherOrBoth, Itertools};
use nalgebra::Vector3;

use super::{level_reports, SrdLevel};
use crate::analysis::stats::{mean, median, std};
use crate::catalog::Field;
use crate::checks::ThresholdReport;
use crate::constants::{ArcMin, Magnitude, MilliArcSec, VisitId};
use crate::conversion::{arcmin_to_rad, rad_to_mas, separation_between, unit_vector};
use crate::matching::group_view::{field_values, Group, GroupView};
use crate::validate_errors::ValidateError;

/// Minimum number of common visits for a pair of objects to be measured.
const MIN_COMMON_VISITS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct AmxParams {
    pub name: String,
    /// Annulus center
    pub d: ArcMin,
    /// Annulus full width
    pub width: ArcMin,
    /// Inclusive range of object mean magnitudes
    pub mag_range: (Magnitude, Magnitude),
}

impl AmxParams {
    pub fn am1() -> Self {
        AmxParams {
            name: "AM1".into(),
            d: 5.0,
            width: 2.0,
            mag_range: (17.5, 21.5),
        }
    }

    pub fn am2() -> Self {
        AmxParams {
            name: "AM2".into(),
            d: 20.0,
            width: 2.0,
            mag_range: (17.5, 21.5),
        }
    }

    /// Inner and outer radius of the annulus, in arcminutes.
    pub fn annulus(&self) -> (ArcMin, ArcMin) {
        (self.d - self.width / 2.0, self.d + self.width / 2.0)
    }

    fn validate(&self) -> Result<(), ValidateError> {
        let (inner, outer) = self.annulus();
        if !(inner >= 0.0 && outer > inner) {
            return Err(ValidateError::InvalidParameter(format!(
                "{} annulus [{inner}, {outer}] arcmin is empty",
                self.name
            )));
        }
        if !(self.mag_range.0 <= self.mag_range.1) {
            return Err(ValidateError::InvalidParameter(format!(
                "{} magnitude range {:?} is empty",
                self.name, self.mag_range
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmxResult {
    pub params: AmxParams,
    /// Scatter of the per-visit separations of every measured pair.
    pub rms_distances: Vec<MilliArcSec>,
    /// Median of `rms_distances`, `NaN` when no pair was measured.
    pub amx: MilliArcSec,
}

impl AmxResult {
    pub fn reports(&self) -> Vec<(SrdLevel, ThresholdReport)> {
        let (lo, hi) = self.params.mag_range;
        level_reports(
            &format!(
                "{} (D={:.0} arcmin, {lo:.1} < mag < {hi:.1})",
                self.params.name, self.params.d
            ),
            self.amx,
            "mas",
            |l| l.amx(),
        )
    }

    /// Stem of the plot file, e.g. `AM1_D_5_arcmin_17.5-21.5`.
    pub fn plot_stem(&self) -> String {
        let (lo, hi) = self.params.mag_range;
        format!(
            "{}_D_{:.0}_arcmin_{lo:.1}-{hi:.1}",
            self.params.name, self.params.d
        )
    }
}

/// Position of an object on each visit, sorted by visit.
fn visit_positions(group: &Group) -> Vec<(VisitId, Vector3<f64>)> {
    let mut positions: Vec<(VisitId, Vector3<f64>)> = group
        .iter()
        .map(|det| (det.data_id.visit, unit_vector(det.ra, det.dec)))
        .collect();
    positions.sort_by_key(|(visit, _)| *visit);
    positions.dedup_by_key(|(visit, _)| *visit);
    positions
}

/// Separations of two objects on each of their common visits, in radians.
pub fn common_visit_separations(
    a: &[(VisitId, Vector3<f64>)],
    b: &[(VisitId, Vector3<f64>)],
) -> Vec<f64> {
    a.iter()
        .merge_join_by(b.iter(), |(va, _), (vb, _)| va.cmp(vb))
        .filter_map(|pair| match pair {
            EitherOrBoth::Both((_, pa), (_, pb)) => Some(separation_between(pa, pb)),
            _ => None,
        })
        .collect()
}

/// Compute AMx on the safe objects.
pub fn calc_amx(groups: &GroupView, params: &AmxParams) -> Result<AmxResult, ValidateError> {
    params.validate()?;

    let (mag_lo, mag_hi) = params.mag_range;
    let (inner, outer) = params.annulus();
    let (inner, outer) = (arcmin_to_rad(inner), arcmin_to_rad(outer));

    let objects: Vec<Vec<(VisitId, Vector3<f64>)>> = groups
        .values()
        .filter(|group| {
            let m = mean(&field_values(group, Field::PsfMag));
            m >= mag_lo && m <= mag_hi
        })
        .map(visit_positions)
        .collect();

    let rms_distances: Vec<MilliArcSec> = objects
        .iter()
        .tuple_combinations()
        .filter_map(|(a, b)| {
            let seps = common_visit_separations(a, b);
            if seps.len() < MIN_COMMON_VISITS {
                return None;
            }
            let mean_sep = mean(&seps);
            (mean_sep >= inner && mean_sep <= outer).then(|| rad_to_mas(std(&seps)))
        })
        .collect();

    tracing::debug!(
        "{}: {} objects in magnitude range, {} pairs in annulus",
        params.name,
        objects.len(),
        rms_distances.len()
    );

    Ok(AmxResult {
        params: params.clone(),
        amx: median(&rms_distances),
        rms_distances,
    })
}

pub fn calc_am1(groups: &GroupView) -> Result<AmxResult, ValidateError> {
    calc_amx(groups, &AmxParams::am1())
}

pub fn calc_am2(groups: &GroupView) -> Result<AmxResult, ValidateError> {
    calc_amx(groups, &AmxParams::am2())
}
