//! Photometric calibration of an exposure.
//!
//! A [`Calib`] holds the zero point of an exposure expressed as the flux of a
//! magnitude-zero source (`FLUXMAG0`) and its uncertainty (`FLUXMAG0ERR`), both read from the
//! exposure metadata. Magnitudes follow the Pogson relation
//!
//! ```text
//! m     = -2.5 log10(f / f0)
//! σ_m   = 2.5 / ln(10) · sqrt((σ_f / f)² + (σ_f0 / f0)²)
//! ```
use std::collections::BTreeMap;

use crate::constants::{DataId, Magnitude, POGSON};
use crate::validate_errors::ValidateError;

pub const FLUXMAG0: &str = "FLUXMAG0";
pub const FLUXMAG0ERR: &str = "FLUXMAG0ERR";

/// Header-like key/value metadata attached to a calibrated exposure.
pub type CalibMetadata = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calib {
    flux_mag0: f64,
    flux_mag0_err: f64,
    throw_on_negative_flux: bool,
}

impl Calib {
    /// New calibration; non-positive fluxes are rejected until
    /// [`set_throw_on_negative_flux(false)`](Calib::set_throw_on_negative_flux) is called.
    pub fn new(flux_mag0: f64, flux_mag0_err: f64) -> Self {
        Calib {
            flux_mag0,
            flux_mag0_err,
            throw_on_negative_flux: true,
        }
    }

    /// Build a calibration from exposure metadata.
    ///
    /// `FLUXMAG0` is mandatory and must be a positive number; a missing `FLUXMAG0ERR` counts as
    /// zero.
    pub fn from_metadata(metadata: &CalibMetadata, data_id: DataId) -> Result<Self, ValidateError> {
        let flux_mag0 = metadata
            .get(FLUXMAG0)
            .ok_or_else(|| ValidateError::MissingCalibKey {
                key: FLUXMAG0.into(),
                data_id,
            })
            .and_then(|v| as_f64(FLUXMAG0, v))?;

        let flux_mag0_err = match metadata.get(FLUXMAG0ERR) {
            Some(v) => as_f64(FLUXMAG0ERR, v)?,
            None => 0.0,
        };

        if !(flux_mag0 > 0.0) {
            return Err(ValidateError::InvalidValue {
                column: FLUXMAG0.into(),
                value: flux_mag0.to_string(),
            });
        }

        Ok(Calib::new(flux_mag0, flux_mag0_err))
    }

    pub fn flux_mag0(&self) -> (f64, f64) {
        (self.flux_mag0, self.flux_mag0_err)
    }

    pub fn set_throw_on_negative_flux(&mut self, throw: bool) {
        self.throw_on_negative_flux = throw;
    }

    pub fn throw_on_negative_flux(&self) -> bool {
        self.throw_on_negative_flux
    }

    fn check_flux(&self, flux: f64) -> Result<(), ValidateError> {
        if self.throw_on_negative_flux && flux <= 0.0 {
            return Err(ValidateError::NegativeFlux(flux));
        }
        Ok(())
    }

    /// Magnitude of a flux.
    pub fn magnitude(&self, flux: f64) -> Result<Magnitude, ValidateError> {
        self.check_flux(flux)?;
        Ok(-2.5 * (flux / self.flux_mag0).log10())
    }

    /// Magnitude and magnitude error of a flux with its 1-σ uncertainty.
    ///
    /// When negative fluxes are tolerated, `flux < 0` yields a `NaN` magnitude and `flux == 0`
    /// an infinite one; both are later rejected by the quality filter.
    pub fn magnitude_with_err(
        &self,
        flux: f64,
        flux_err: f64,
    ) -> Result<(Magnitude, Magnitude), ValidateError> {
        let mag = self.magnitude(flux)?;
        let err = POGSON * (flux_err / flux).hypot(self.flux_mag0_err / self.flux_mag0);
        Ok((mag, err))
    }

    /// Inverse transform: flux of a source of magnitude `mag`.
    pub fn flux(&self, mag: Magnitude) -> f64 {
        self.flux_mag0 * 10f64.powf(-0.4 * mag)
    }
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64, ValidateError> {
    value.as_f64().ok_or_else(|| ValidateError::InvalidValue {
        column: key.to_string(),
        value: value.to_string(),
    })
}
