use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use crate::constants::{ArcMin, ArcSec, MilliArcSec, Radian, RAD2MAS, RADMIN, RADSEC};

/// Convert an angle in arcseconds to radians
#[inline]
pub fn arcsec_to_rad(angle: ArcSec) -> Radian {
    angle * RADSEC
}

/// Convert an angle in arcminutes to radians
#[inline]
pub fn arcmin_to_rad(angle: ArcMin) -> Radian {
    angle * RADMIN
}

/// Convert an angle in radians to milliarcseconds
#[inline]
pub fn rad_to_mas(angle: Radian) -> MilliArcSec {
    angle * RAD2MAS
}

/// Unit vector pointing toward `(ra, dec)` on the celestial sphere.
///
/// Arguments
/// ---------
/// * `ra`: right ascension in radians
/// * `dec`: declination in radians
///
/// Return
/// ------
/// * the cartesian unit vector `(cos δ cos α, cos δ sin α, sin δ)`
#[inline]
pub fn unit_vector(ra: Radian, dec: Radian) -> Vector3<f64> {
    let (sin_ra, cos_ra) = ra.sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Signed angle difference `a - b` wrapped into `(-π, π]`.
///
/// Right ascensions on either side of `α = 0` differ by a small angle, not by ~2π.
#[inline]
pub fn wrap_angle_diff(a: Radian, b: Radian) -> Radian {
    let d = (a - b).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

/// Great-circle distance between two unit vectors (radians).
///
/// `atan2(|a × b|, a · b)` is well conditioned for both tiny and near-antipodal separations.
#[inline]
pub fn separation_between(a: &Vector3<f64>, b: &Vector3<f64>) -> Radian {
    a.cross(b).norm().atan2(a.dot(b))
}

#[cfg(test)]
mod conversion_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_angle_conversions() {
        assert_relative_eq!(arcsec_to_rad(3600.0), 1.0_f64.to_radians(), epsilon = 1e-15);
        assert_relative_eq!(arcmin_to_rad(60.0), 1.0_f64.to_radians(), epsilon = 1e-15);
        assert_relative_eq!(rad_to_mas(arcsec_to_rad(1.0)), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wrap_angle_diff() {
        let one_mas = arcsec_to_rad(0.001);
        assert_relative_eq!(wrap_angle_diff(0.3, 0.1), 0.2, epsilon = 1e-15);
        assert_relative_eq!(wrap_angle_diff(0.1, 0.3), -0.2, epsilon = 1e-15);
        assert_relative_eq!(
            wrap_angle_diff(one_mas, TAU - one_mas),
            2.0 * one_mas,
            max_relative = 1e-6
        );
        assert_relative_eq!(
            wrap_angle_diff(TAU - one_mas, one_mas),
            -2.0 * one_mas,
            max_relative = 1e-6
        );
        assert_relative_eq!(wrap_angle_diff(PI, 0.0), PI, epsilon = 1e-15);
    }

    #[test]
    fn test_separation_between_vectors() {
        let (ra1, dec1) = (10.0_f64.to_radians(), -30.0_f64.to_radians());
        let (ra2, dec2) = (10.01_f64.to_radians(), -30.02_f64.to_radians());

        let a = unit_vector(ra1, dec1);
        let b = unit_vector(ra2, dec2);
        assert_relative_eq!(a.norm(), 1.0, epsilon = 1e-15);
        // Haversine distance between the same two positions
        let h = ((dec2 - dec1) / 2.0).sin().powi(2)
            + dec1.cos() * dec2.cos() * ((ra2 - ra1) / 2.0).sin().powi(2);
        assert_relative_eq!(
            separation_between(&a, &b),
            2.0 * h.sqrt().asin(),
            max_relative = 1e-9
        );

        let c = unit_vector(ra1, dec1 + arcsec_to_rad(1.0));
        assert_relative_eq!(separation_between(&a, &c), arcsec_to_rad(1.0), max_relative = 1e-6);
    }
}
