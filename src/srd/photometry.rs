//! Photometric repeatability: PA1, PA2 and PF1.
//!
//! For every object one random pair of distinct detections is drawn and the magnitude
//! difference is converted to a single-measurement scatter in millimagnitudes
//! (`1000 · Δm / √2`). The distribution of these differences is summarized by
//!
//! * an RMS width, `sqrt(mean(d²))`,
//! * an IQR width, `(P75 − P25) / (2 · 0.6745)`, robust to outliers.
//!
//! PA1 repeats the draw several times with the same RNG and reports mean and standard
//! deviation of both widths. PA2 at a given SRD level is the `100 − PF1` percentile of `|d|`.
use rand::seq::index::sample;
use rand::Rng;

use super::{level_reports, SrdLevel};
use crate::analysis::stats::{mean, percentile, percentiles, std};
use crate::catalog::Field;
use crate::checks::ThresholdReport;
use crate::constants::{Magnitude, MilliMag, MAG2MMAG};
use crate::matching::group_view::{field_values, GroupSet, GroupView};
use crate::validate_errors::ValidateError;

/// Quantile of the standard normal distribution at 0.75.
const NORM_PPF_075: f64 = 0.674_489_750_196_081_7;

/// Difference of two distinct random members of `values`, `None` below two values.
fn random_diff<R: Rng + ?Sized>(values: &[f64], rng: &mut R) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let pair = sample(rng, values.len(), 2);
    Some(values[pair.index(0)] - values[pair.index(1)])
}

/// One random magnitude difference per object, in millimagnitudes per measurement.
///
/// Return
/// ------
/// * `(diffs, mean_mags)`, aligned and in ascending object id order; objects with fewer than
///   two detections are skipped
pub fn random_pair_diffs<R: Rng + ?Sized>(
    groups: &GroupView,
    rng: &mut R,
) -> (Vec<MilliMag>, Vec<Magnitude>) {
    let mut diffs = Vec::with_capacity(groups.number_of_groups());
    let mut mags = Vec::with_capacity(groups.number_of_groups());
    for group in groups.values() {
        let values = field_values(group, Field::PsfMag);
        if let Some(d) = random_diff(&values, rng) {
            diffs.push(MAG2MMAG * d / std::f64::consts::SQRT_2);
            mags.push(mean(&values));
        }
    }
    (diffs, mags)
}

/// RMS and IQR-based widths of a distribution of differences.
pub fn compute_widths(diffs: &[f64]) -> (f64, f64) {
    let squares: Vec<f64> = diffs.iter().map(|d| d * d).collect();
    let rms = mean(&squares).sqrt();
    let [p75, p25] = percentiles(diffs, [75.0, 25.0]);
    let iqr = (p75 - p25) / (2.0 * NORM_PPF_075);
    (rms, iqr)
}

/// PA1 over several random draws.
#[derive(Debug, Clone, PartialEq)]
pub struct Pa1Result {
    pub rms_mean: MilliMag,
    pub rms_std: MilliMag,
    pub iqr_mean: MilliMag,
    pub iqr_std: MilliMag,
    /// Differences of the last draw, for plotting.
    pub diffs: Vec<MilliMag>,
    /// Mean magnitude of the objects behind `diffs`.
    pub mags: Vec<Magnitude>,
    pub n_shuffles: usize,
}

impl Pa1Result {
    /// PA1 value compared to the requirements, the IQR width being the reference estimator.
    pub fn reports(&self) -> Vec<(SrdLevel, ThresholdReport)> {
        level_reports("PA1", self.iqr_mean, "mmag", |l| l.pa1())
    }
}

/// Compute PA1.
///
/// Arguments
/// ---------
/// * `groups`: safe matched objects
/// * `n_shuffles`: number of random draws (at least 1)
/// * `rng`: random source; a seeded RNG makes the result reproducible
pub fn calc_pa1<R: Rng + ?Sized>(
    groups: &GroupView,
    n_shuffles: usize,
    rng: &mut R,
) -> Result<Pa1Result, ValidateError> {
    if n_shuffles == 0 {
        return Err(ValidateError::InvalidParameter(
            "PA1 needs at least one random shuffle".into(),
        ));
    }

    let mut rms = Vec::with_capacity(n_shuffles);
    let mut iqr = Vec::with_capacity(n_shuffles);
    let mut last = (Vec::new(), Vec::new());
    for _ in 0..n_shuffles {
        let (diffs, mags) = random_pair_diffs(groups, rng);
        let (r, i) = compute_widths(&diffs);
        rms.push(r);
        iqr.push(i);
        last = (diffs, mags);
    }

    Ok(Pa1Result {
        rms_mean: mean(&rms),
        rms_std: std(&rms),
        iqr_mean: mean(&iqr),
        iqr_std: std(&iqr),
        diffs: last.0,
        mags: last.1,
        n_shuffles,
    })
}

/// PA2 at one SRD level.
#[derive(Debug, Clone, PartialEq)]
pub struct Pa2Result {
    pub level: SrdLevel,
    /// Percentage of differences allowed above `pa2`.
    pub pf1: f64,
    /// Measured limit such that `pf1` percent of `|d|` lie above it.
    pub pa2: MilliMag,
    pub report: ThresholdReport,
}

/// Compute PA2 for every SRD level from one random draw.
pub fn calc_pa2<R: Rng + ?Sized>(groups: &GroupView, rng: &mut R) -> Vec<Pa2Result> {
    let (diffs, _) = random_pair_diffs(groups, rng);
    let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();

    SrdLevel::ALL
        .iter()
        .map(|&level| {
            let pf1 = level.pf1();
            let pa2 = percentile(&abs, 100.0 - pf1);
            Pa2Result {
                level,
                pf1,
                pa2,
                report: ThresholdReport::at_most(
                    &format!("PA2 for PF1={pf1:.0}% ({level})"),
                    pa2,
                    level.pa2(),
                    "mmag",
                ),
            }
        })
        .collect()
}
