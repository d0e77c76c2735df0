//! # Constants and type definitions for validate_drp
//!
//! This module centralizes the **unit conversions**, **reference thresholds** and **common
//! type definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - Angular conversions (degrees ↔ radians, arcseconds/arcminutes/milliarcseconds ↔ radians)
//! - Photometric conventions (magnitudes, millimagnitudes)
//! - Default pipeline parameters (match radius, magnitude limits, reference values)
//! - Identifiers attached to detections and matched objects
//!
//! Every numeric type alias is a plain `f64`: they document units, they do not enforce them.

use std::fmt;
use std::str::FromStr;

use crate::validate_errors::ValidateError;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648_000.0;

/// Arcminutes → radians
pub const RADMIN: f64 = std::f64::consts::PI / 10_800.0;

/// Radians → milliarcseconds
pub const RAD2MAS: f64 = 648_000_000.0 / std::f64::consts::PI;

/// Magnitudes → millimagnitudes
pub const MAG2MMAG: f64 = 1000.0;

/// 2.5 / ln(10), the derivative of the Pogson magnitude with respect to ln(flux)
pub const POGSON: f64 = 1.085_736_204_758_129_6;

// -------------------------------------------------------------------------------------------------
// Pipeline defaults
// -------------------------------------------------------------------------------------------------

/// Default cross-visit match radius
pub const DEFAULT_MATCH_RADIUS: ArcSec = 1.0;

/// Minimum number of detections for a matched object to be kept
pub const N_MATCHES_REQUIRED: usize = 2;

/// Brightness limit used by the analysis step when nothing else is requested
pub const DEFAULT_GOOD_MAG_LIMIT: Magnitude = 19.5;

/// Brightness limit used by a full validation run
pub const RUN_GOOD_MAG_LIMIT: Magnitude = 21.0;

/// Upper bound (exclusive) on extendedness for a source to count as stellar
pub const SAFE_MAX_EXTENDED: f64 = 1.0;

/// Expected median astrometric scatter across visits
pub const MEDIAN_ASTROM_SCATTER_REF: MilliArcSec = 25.0;

/// Expected median photometric scatter across visits
pub const MEDIAN_PHOTO_SCATTER_REF: MilliMag = 25.0;

/// Expected number of stars matched across visits
pub const MATCH_REF: usize = 500;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in arcminutes
pub type ArcMin = f64;
/// Angle in milliarcseconds
pub type MilliArcSec = f64;
/// AB/instrumental magnitude
pub type Magnitude = f64;
/// Millimagnitude
pub type MilliMag = f64;

/// Identifier of a visit (one exposure)
pub type VisitId = u32;
/// Identifier of a CCD inside a visit
pub type CcdId = u32;
/// Synthetic object identifier assigned by the matcher
pub type ObjectId = u64;
/// Identifier of a source inside its own catalog
pub type SourceId = u64;

// -------------------------------------------------------------------------------------------------
// Data identifiers
// -------------------------------------------------------------------------------------------------

/// Name used by a camera for the CCD component of a data id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CcdKey {
    #[default]
    Ccd,
    CcdNum,
}

impl CcdKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CcdKey::Ccd => "ccd",
            CcdKey::CcdNum => "ccdnum",
        }
    }
}

impl fmt::Display for CcdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one visit/CCD detection catalog.
///
/// The textual form is a comma separated list of `key=value` pairs, e.g. `visit=1234,ccd=10`
/// or `ccdnum=5, visit=42`. Exactly one of `ccd`/`ccdnum` must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId {
    pub visit: VisitId,
    pub ccd: CcdId,
    pub ccd_key: CcdKey,
}

impl DataId {
    pub fn new(visit: VisitId, ccd: CcdId) -> Self {
        DataId {
            visit,
            ccd,
            ccd_key: CcdKey::Ccd,
        }
    }

    pub fn with_ccd_key(mut self, ccd_key: CcdKey) -> Self {
        self.ccd_key = ccd_key;
        self
    }

    /// File stem used by the file repository, e.g. `v1234-ccd10`.
    pub fn file_stem(&self) -> String {
        format!("v{}-{}{}", self.visit, self.ccd_key, self.ccd)
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "visit={},{}={}", self.visit, self.ccd_key, self.ccd)
    }
}

impl FromStr for DataId {
    type Err = ValidateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut visit = None;
        let mut ccd = None;

        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| ValidateError::InvalidDataId(s.to_string()))?;
            let value: u32 = value
                .trim()
                .parse()
                .map_err(|_| ValidateError::InvalidDataId(s.to_string()))?;

            match key.trim() {
                "visit" => visit = Some(value),
                "ccd" => ccd = Some((CcdKey::Ccd, value)),
                "ccdnum" => ccd = Some((CcdKey::CcdNum, value)),
                _ => return Err(ValidateError::InvalidDataId(s.to_string())),
            }
        }

        let visit = visit.ok_or_else(|| ValidateError::InvalidDataId(s.to_string()))?;
        let (ccd_key, ccd) = ccd.ok_or_else(|| ValidateError::UnknownCcdKey(s.to_string()))?;

        Ok(DataId {
            visit,
            ccd,
            ccd_key,
        })
    }
}

/// Build the cartesian product `visits × ccds` as data ids, visit-major.
pub fn construct_data_ids(visits: &[VisitId], ccds: &[CcdId], ccd_key: CcdKey) -> Vec<DataId> {
    visits
        .iter()
        .flat_map(|&visit| {
            ccds.iter().map(move |&ccd| DataId {
                visit,
                ccd,
                ccd_key,
            })
        })
        .collect()
}
