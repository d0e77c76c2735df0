//! # Science Requirements Document (SRD) metrics
//!
//! Repeatability metrics computed on the **safe** matched objects (bright, stellar, good
//! quality), each compared to the three SRD requirement levels.
//!
//! | metric | meaning                                                     | unit  | minimum | design | stretch |
//! |--------|-------------------------------------------------------------|-------|---------|--------|---------|
//! | PA1    | RMS of the photometric repeatability                        | mmag  | 8       | 5      | 3       |
//! | PF1    | fraction of magnitude differences allowed above PA2         | %     | 20      | 10     | 5       |
//! | PA2    | outlier limit such that a fraction PF1 of differences exceeds it | mmag | 15  | 15     | 10      |
//! | AM1    | RMS of distance repeatability for pairs 5′ apart            | mas   | 20      | 10     | 5       |
//! | AM2    | RMS of distance repeatability for pairs 20′ apart           | mas   | 20      | 10     | 5       |
//!
//! See also
//! ------------
//! * [`photometry`] – PA1, PA2 and PF1.
//! * [`astrometry`] – AM1 and AM2.
use std::fmt;

use crate::checks::ThresholdReport;
use crate::constants::{MilliArcSec, MilliMag};

pub mod astrometry;
pub mod photometry;

pub use astrometry::{calc_am1, calc_am2, calc_amx, AmxParams, AmxResult};
pub use photometry::{calc_pa1, calc_pa2, compute_widths, Pa1Result, Pa2Result};

/// Requirement level of the SRD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SrdLevel {
    Minimum,
    Design,
    Stretch,
}

impl SrdLevel {
    pub const ALL: [SrdLevel; 3] = [SrdLevel::Minimum, SrdLevel::Design, SrdLevel::Stretch];

    pub fn as_str(&self) -> &'static str {
        match self {
            SrdLevel::Minimum => "minimum",
            SrdLevel::Design => "design",
            SrdLevel::Stretch => "stretch",
        }
    }

    pub fn pa1(&self) -> MilliMag {
        match self {
            SrdLevel::Minimum => 8.0,
            SrdLevel::Design => 5.0,
            SrdLevel::Stretch => 3.0,
        }
    }

    /// Percentage of magnitude differences allowed to exceed PA2.
    pub fn pf1(&self) -> f64 {
        match self {
            SrdLevel::Minimum => 20.0,
            SrdLevel::Design => 10.0,
            SrdLevel::Stretch => 5.0,
        }
    }

    pub fn pa2(&self) -> MilliMag {
        match self {
            SrdLevel::Minimum => 15.0,
            SrdLevel::Design => 15.0,
            SrdLevel::Stretch => 10.0,
        }
    }

    /// AM1 and AM2 share the same requirements.
    pub fn amx(&self) -> MilliArcSec {
        match self {
            SrdLevel::Minimum => 20.0,
            SrdLevel::Design => 10.0,
            SrdLevel::Stretch => 5.0,
        }
    }
}

impl fmt::Display for SrdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare a metric value to its requirement at every SRD level.
pub fn level_reports(
    metric: &str,
    value: f64,
    unit: &str,
    requirement: impl Fn(SrdLevel) -> f64,
) -> Vec<(SrdLevel, ThresholdReport)> {
    SrdLevel::ALL
        .iter()
        .map(|&level| {
            let report = ThresholdReport::at_most(
                &format!("{metric} ({level})"),
                value,
                requirement(level),
                unit,
            );
            (level, report)
        })
        .collect()
}
