//! # Threshold checks
//!
//! Regression gates comparing the repeatability of a run to fixed operational references.
//! These are not hypothesis tests: a check passes when
//!
//! * the **median scatter** of the objects at or brighter than the bright limit is finite and
//!   does not exceed the reference, and
//! * the **match count** reaches the reference count.
//!
//! Each condition yields one [`ThresholdReport`]; a [`CheckOutcome`] bundles both with the
//! informational median over all magnitudes.
use std::fmt;

use crate::analysis::stats::median;
use crate::constants::{Magnitude, MilliArcSec, MilliMag};

/// Outcome of one comparison against a reference value.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdReport {
    pub metric: String,
    pub value: f64,
    pub reference: f64,
    pub unit: String,
    pub passed: bool,
}

impl ThresholdReport {
    /// Upper-bound comparison: passes when `value` is finite and `value <= reference`.
    pub fn at_most(metric: &str, value: f64, reference: f64, unit: &str) -> Self {
        ThresholdReport {
            metric: metric.to_string(),
            value,
            reference,
            unit: unit.to_string(),
            passed: value.is_finite() && value <= reference,
        }
    }

    /// Lower-bound comparison: passes when `value >= reference`.
    pub fn at_least(metric: &str, value: f64, reference: f64, unit: &str) -> Self {
        ThresholdReport {
            metric: metric.to_string(),
            value,
            reference,
            unit: unit.to_string(),
            passed: value >= reference,
        }
    }
}

impl fmt::Display for ThresholdReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "{}: {:.1} {} (reference {:.1} {}) [{status}]",
            self.metric, self.value, self.unit, self.reference, self.unit
        )
    }
}

/// Scatter and match-count verdicts of one check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub name: String,
    pub unit: String,
    pub bright_limit: Magnitude,
    /// Median scatter over every object, informational only.
    pub median_all: f64,
    pub scatter: ThresholdReport,
    pub matches: ThresholdReport,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.scatter.passed && self.matches.passed
    }

    pub fn reports(&self) -> [&ThresholdReport; 2] {
        [&self.scatter, &self.matches]
    }
}

fn bright_median(mag: &[Magnitude], scatter: &[f64], bright_limit: Magnitude) -> f64 {
    let bright: Vec<f64> = mag
        .iter()
        .zip(scatter)
        .filter(|(m, _)| **m <= bright_limit)
        .map(|(_, s)| *s)
        .collect();
    median(&bright)
}

#[allow(clippy::too_many_arguments)]
fn check(
    name: &str,
    unit: &str,
    mag: &[Magnitude],
    scatter: &[f64],
    match_count: usize,
    bright_limit: Magnitude,
    median_ref: f64,
    match_ref: usize,
) -> CheckOutcome {
    let bright = bright_median(mag, scatter, bright_limit);
    let outcome = CheckOutcome {
        name: name.to_string(),
        unit: unit.to_string(),
        bright_limit,
        median_all: median(scatter),
        scatter: ThresholdReport::at_most(
            &format!("Median {name} scatter (mag <= {bright_limit:.1})"),
            bright,
            median_ref,
            unit,
        ),
        matches: ThresholdReport::at_least(
            "Matched objects",
            match_count as f64,
            match_ref as f64,
            "",
        ),
    };

    if !outcome.scatter.passed {
        tracing::warn!(
            "median {name} scatter {bright:.1} {unit} is larger than reference {median_ref:.1} {unit}"
        );
    }
    if !outcome.matches.passed {
        tracing::warn!(
            "number of matched sources {match_count} is too small (should be >= {match_ref})"
        );
    }
    outcome
}

/// Astrometric repeatability check.
///
/// Arguments
/// ---------
/// * `mag`: mean magnitude of each object
/// * `dist`: positional scatter of each object, aligned with `mag`
/// * `match_count`: number of matched objects
/// * `bright_limit`: only objects with `mag <= bright_limit` enter the median
/// * `median_ref`: largest acceptable median scatter
/// * `match_ref`: smallest acceptable match count
pub fn check_astrometry(
    mag: &[Magnitude],
    dist: &[MilliArcSec],
    match_count: usize,
    bright_limit: Magnitude,
    median_ref: MilliArcSec,
    match_ref: usize,
) -> CheckOutcome {
    check(
        "astrometric",
        "mas",
        mag,
        dist,
        match_count,
        bright_limit,
        median_ref,
        match_ref,
    )
}

/// Photometric repeatability check, on the scatter in millimagnitudes.
///
/// Same arguments as [`check_astrometry`] with `mmag_rms` as the scatter.
pub fn check_photometry(
    mag: &[Magnitude],
    mmag_rms: &[MilliMag],
    match_count: usize,
    bright_limit: Magnitude,
    median_ref: MilliMag,
    match_ref: usize,
) -> CheckOutcome {
    check(
        "photometric",
        "mmag",
        mag,
        mmag_rms,
        match_count,
        bright_limit,
        median_ref,
        match_ref,
    )
}

#[cfg(test)]
mod checks_test {
    use super::*;

    #[test]
    fn test_scatter_against_reference() {
        let mag = [17.0, 18.0, 19.0];

        let failing = check_photometry(&mag, &[30.0, 30.0, 30.0], 600, 19.5, 25.0, 500);
        assert!(!failing.scatter.passed);
        assert!(failing.matches.passed);
        assert!(!failing.passed());

        let passing = check_astrometry(&mag, &[20.0, 20.0, 20.0], 600, 19.5, 25.0, 500);
        assert!(passing.passed());
        assert_eq!(passing.scatter.value, 20.0);
    }

    #[test]
    fn test_bright_limit_selects_stars() {
        // The faint object with a huge scatter is left out of the median
        let outcome = check_astrometry(&[17.0, 18.0, 22.0], &[10.0, 12.0, 500.0], 600, 21.0, 25.0, 500);
        assert_eq!(outcome.scatter.value, 11.0);
        assert_eq!(outcome.median_all, 12.0);
        assert!(outcome.passed());

        // At the limit is included
        let outcome = check_astrometry(&[21.0], &[5.0], 600, 21.0, 25.0, 500);
        assert_eq!(outcome.scatter.value, 5.0);
    }

    #[test]
    fn test_match_count_gate() {
        let outcome = check_photometry(&[17.0, 18.0], &[1.0, 1.0], 100, 19.5, 25.0, 500);
        assert!(outcome.scatter.passed);
        assert!(!outcome.matches.passed);
        assert!(!outcome.passed());
    }

    #[test]
    fn test_empty_input_fails() {
        let outcome = check_photometry(&[], &[], 0, 21.0, 25.0, 500);
        assert!(outcome.scatter.value.is_nan());
        assert!(!outcome.scatter.passed);
        assert!(!outcome.passed());
    }

    #[test]
    fn test_report_display() {
        let report = ThresholdReport::at_most("Median astrometric scatter", 20.04, 25.0, "mas");
        assert_eq!(
            report.to_string(),
            "Median astrometric scatter: 20.0 mas (reference 25.0 mas) [PASS]"
        );
    }
}
