//! # Source catalogs: detections, schema and calibration
//!
//! Typed representation of one **visit/CCD detection catalog** as produced by single-frame
//! processing, plus the photometric calibration used to turn PSF fluxes into magnitudes.
//!
//! ## Overview
//! -----------------
//! * [`Detection`] – one measured source (position, PSF flux, calibrated magnitude,
//!   pixel flags, extendedness, owning [`DataId`]). `Copy` and immutable once loaded.
//! * [`Schema`] – ordered column names of a catalog, with lookup by name and the
//!   required-column check used at ingestion.
//! * [`SourceCatalog`] – detections of one data id together with their schema.
//! * [`calib::Calib`] – flux ↔ magnitude transform built from the exposure metadata.
//! * [`csv_reader`] – CSV ingestion of catalogs and schemas.
//!
//! ## Columns
//! -----------------
//! The required columns are listed in [`REQUIRED_COLUMNS`]. On disk, `coord_ra` and
//! `coord_dec` are in **degrees**; they are converted to **radians** at load time. The two
//! magnitude columns [`PSF_MAG`] and [`PSF_MAGERR`] are *output* fields added by
//! [`Schema::with_magnitude_fields`] and filled by [`SourceCatalog::calibrate`].
//!
//! ## Units
//! -----------------
//! * Positions: radians.
//! * Fluxes: instrumental counts (same unit as `FLUXMAG0`).
//! * Magnitudes: calibrated magnitudes; errors in magnitudes.
use crate::constants::{DataId, Magnitude, Radian, SourceId};
use crate::validate_errors::ValidateError;

pub mod calib;
pub mod csv_reader;

use calib::Calib;

pub const SOURCE_ID: &str = "id";
pub const COORD_RA: &str = "coord_ra";
pub const COORD_DEC: &str = "coord_dec";
pub const PSF_FLUX: &str = "base_PsfFlux_flux";
pub const PSF_FLUX_SIGMA: &str = "base_PsfFlux_fluxSigma";
pub const FLAG_SATURATED: &str = "base_PixelFlags_flag_saturated";
pub const FLAG_CR: &str = "base_PixelFlags_flag_cr";
pub const FLAG_BAD: &str = "base_PixelFlags_flag_bad";
pub const FLAG_EDGE: &str = "base_PixelFlags_flag_edge";
pub const EXTENDEDNESS: &str = "base_ClassificationExtendedness_value";
pub const PSF_MAG: &str = "base_PsfFlux_mag";
pub const PSF_MAGERR: &str = "base_PsfFlux_magerr";

/// Columns every source catalog must provide.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    SOURCE_ID,
    COORD_RA,
    COORD_DEC,
    PSF_FLUX,
    PSF_FLUX_SIGMA,
    FLAG_SATURATED,
    FLAG_CR,
    FLAG_BAD,
    FLAG_EDGE,
    EXTENDEDNESS,
];

/// Pixel-level quality flags of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelFlags {
    pub saturated: bool,
    pub cr: bool,
    pub bad: bool,
    pub edge: bool,
}

impl PixelFlags {
    /// `true` if any disqualifying flag is set.
    #[inline]
    pub fn any(&self) -> bool {
        self.saturated || self.cr || self.bad || self.edge
    }
}

/// Numeric per-detection quantities that can be pulled out of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Ra,
    Dec,
    PsfFlux,
    PsfFluxSigma,
    PsfMag,
    PsfMagErr,
    Extendedness,
}

impl Field {
    /// Column name of this field in a catalog schema.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Ra => COORD_RA,
            Field::Dec => COORD_DEC,
            Field::PsfFlux => PSF_FLUX,
            Field::PsfFluxSigma => PSF_FLUX_SIGMA,
            Field::PsfMag => PSF_MAG,
            Field::PsfMagErr => PSF_MAGERR,
            Field::Extendedness => EXTENDEDNESS,
        }
    }
}

/// One source measured on one visit/CCD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub id: SourceId,
    pub ra: Radian,
    pub dec: Radian,
    pub psf_flux: f64,
    pub psf_flux_sigma: f64,
    pub psf_mag: Magnitude,
    pub psf_mag_err: Magnitude,
    pub flags: PixelFlags,
    pub extendedness: f64,
    pub data_id: DataId,
}

impl Detection {
    /// Create an uncalibrated detection: magnitudes are `NaN` until
    /// [`SourceCatalog::calibrate`] runs.
    ///
    /// Arguments
    /// ---------
    /// * `id`: source identifier inside its catalog
    /// * `ra`, `dec`: position in radians
    /// * `psf_flux`, `psf_flux_sigma`: PSF flux and its 1-σ uncertainty
    /// * `data_id`: the visit/CCD the source was measured on
    pub fn new(
        id: SourceId,
        ra: Radian,
        dec: Radian,
        psf_flux: f64,
        psf_flux_sigma: f64,
        data_id: DataId,
    ) -> Self {
        Detection {
            id,
            ra,
            dec,
            psf_flux,
            psf_flux_sigma,
            psf_mag: f64::NAN,
            psf_mag_err: f64::NAN,
            flags: PixelFlags::default(),
            extendedness: 0.0,
            data_id,
        }
    }

    pub fn with_flags(mut self, flags: PixelFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_extendedness(mut self, extendedness: f64) -> Self {
        self.extendedness = extendedness;
        self
    }

    /// Set the calibrated magnitude directly (used by in-memory catalogs and tests).
    pub fn with_magnitude(mut self, mag: Magnitude, mag_err: Magnitude) -> Self {
        self.psf_mag = mag;
        self.psf_mag_err = mag_err;
        self
    }

    /// Value of a numeric field.
    #[inline]
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Ra => self.ra,
            Field::Dec => self.dec,
            Field::PsfFlux => self.psf_flux,
            Field::PsfFluxSigma => self.psf_flux_sigma,
            Field::PsfMag => self.psf_mag,
            Field::PsfMagErr => self.psf_mag_err,
            Field::Extendedness => self.extendedness,
        }
    }
}

/// Ordered list of column names of a source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Schema holding exactly the required columns, in canonical order.
    pub fn minimal() -> Self {
        Schema::new(REQUIRED_COLUMNS)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Index of a column.
    ///
    /// Return
    /// ------
    /// * the position of `name`, or [`ValidateError::MissingField`]
    pub fn find(&self, name: &str) -> Result<usize, ValidateError> {
        self.fields
            .iter()
            .position(|f| f == name)
            .ok_or_else(|| ValidateError::MissingField(name.to_string()))
    }

    /// Fail on the first required column absent from this schema.
    pub fn validate_required(&self) -> Result<(), ValidateError> {
        REQUIRED_COLUMNS
            .iter()
            .try_for_each(|name| self.find(name).map(|_| ()))
    }

    /// Copy of this schema extended with the PSF magnitude output fields.
    pub fn with_magnitude_fields(&self) -> Schema {
        let mut out = self.clone();
        for name in [PSF_MAG, PSF_MAGERR] {
            if !out.contains(name) {
                out.fields.push(name.to_string());
            }
        }
        out
    }

    /// Two schemas are compatible when they expose the same set of required columns
    /// (extra columns and ordering are irrelevant once the catalog is typed).
    pub fn is_compatible_with(&self, other: &Schema) -> bool {
        REQUIRED_COLUMNS
            .iter()
            .chain([PSF_MAG, PSF_MAGERR].iter())
            .all(|name| self.contains(name) == other.contains(name))
    }
}

/// All detections of one data id.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCatalog {
    pub schema: Schema,
    pub data_id: DataId,
    pub detections: Vec<Detection>,
}

impl SourceCatalog {
    pub fn new(schema: Schema, data_id: DataId, detections: Vec<Detection>) -> Self {
        SourceCatalog {
            schema,
            data_id,
            detections,
        }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    /// Fill the magnitude columns from the PSF fluxes and extend the schema accordingly.
    ///
    /// Arguments
    /// ---------
    /// * `calib`: the photometric calibration of this exposure
    ///
    /// Return
    /// ------
    /// * `Err(NegativeFlux)` only when `calib` is configured to reject non-positive fluxes;
    ///   otherwise such detections get a non-finite magnitude.
    pub fn calibrate(&mut self, calib: &Calib) -> Result<(), ValidateError> {
        for det in self.detections.iter_mut() {
            let (mag, mag_err) = calib.magnitude_with_err(det.psf_flux, det.psf_flux_sigma)?;
            det.psf_mag = mag;
            det.psf_mag_err = mag_err;
        }
        self.schema = self.schema.with_magnitude_fields();
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SourceCatalog {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

#[cfg(test)]
mod catalog_test {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::minimal();
        assert_eq!(schema.find(SOURCE_ID), Ok(0));
        assert_eq!(schema.find(EXTENDEDNESS), Ok(9));
        assert_eq!(
            schema.find(PSF_MAG),
            Err(ValidateError::MissingField(PSF_MAG.into()))
        );
        assert!(schema.validate_required().is_ok());

        let extended = schema.with_magnitude_fields();
        assert_eq!(extended.len(), 12);
        assert_eq!(extended.find(PSF_MAGERR), Ok(11));
        // Adding twice is a no-op
        assert_eq!(extended.with_magnitude_fields(), extended);
    }

    #[test]
    fn test_schema_missing_required() {
        let schema = Schema::new(["id", "coord_ra", "coord_dec"]);
        assert_eq!(
            schema.validate_required(),
            Err(ValidateError::MissingField(PSF_FLUX.into()))
        );
    }

    #[test]
    fn test_schema_compatibility() {
        let a = Schema::minimal().with_magnitude_fields();
        let mut fields: Vec<String> = a.fields().iter().rev().cloned().collect();
        fields.push("base_SdssShape_xx".into());
        let b = Schema::new(fields);
        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&Schema::minimal()));
    }

    #[test]
    fn test_calibrate_catalog() {
        let data_id = DataId::new(1, 2);
        let detections = vec![
            Detection::new(1, 0.1, 0.2, 1.0e4, 1.0e2, data_id),
            Detection::new(2, 0.1, 0.2, -5.0, 1.0, data_id),
        ];
        let mut cat = SourceCatalog::new(Schema::minimal(), data_id, detections);

        let mut calib = Calib::new(1.0e12, 0.0);
        calib.set_throw_on_negative_flux(false);
        cat.calibrate(&calib).unwrap();

        assert!((cat.detections[0].psf_mag - 20.0).abs() < 1e-12);
        assert!(cat.detections[1].psf_mag.is_nan());
        assert!(cat.schema.contains(PSF_MAG));
        assert!(cat.schema.contains(PSF_MAGERR));
    }

    #[test]
    fn test_detection_fields() {
        let det = Detection::new(7, 1.0, -0.5, 10.0, 1.0, DataId::new(3, 4))
            .with_magnitude(18.0, 0.01)
            .with_extendedness(0.5)
            .with_flags(PixelFlags {
                edge: true,
                ..Default::default()
            });
        assert_eq!(det.get(Field::Ra), 1.0);
        assert_eq!(det.get(Field::Dec), -0.5);
        assert_eq!(det.get(Field::PsfMag), 18.0);
        assert_eq!(det.get(Field::PsfMagErr), 0.01);
        assert_eq!(det.get(Field::Extendedness), 0.5);
        assert!(det.flags.any());
        assert!(!PixelFlags::default().any());
    }
}
