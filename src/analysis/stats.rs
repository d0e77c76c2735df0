//! Descriptive statistics over `f64` samples.
//!
//! All reductions follow the usual numerical conventions: an empty sample gives `NaN`, a sample
//! containing `NaN` gives `NaN`, variances are population variances (divide by `n`) and
//! percentiles interpolate linearly between closest ranks.
use crate::constants::{MilliArcSec, Radian};
use crate::conversion::{rad_to_mas, wrap_angle_diff};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

fn sorted(values: &[f64]) -> Option<Vec<f64>> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    Some(out)
}

/// Percentile `q` in `[0, 100]`, linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let Some(sorted) = sorted(values) else {
        return f64::NAN;
    };
    percentile_of_sorted(&sorted, q)
}

fn percentile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Several percentiles computed from a single sort.
pub fn percentiles<const N: usize>(values: &[f64], qs: [f64; N]) -> [f64; N] {
    match sorted(values) {
        Some(sorted) => qs.map(|q| percentile_of_sorted(&sorted, q)),
        None => [f64::NAN; N],
    }
}

/// Positional scatter of a set of positions, in milliarcseconds.
///
/// The right ascension spread is projected on the sky with the cosine of the mean declination:
///
/// ```text
/// rms = sqrt(var(α) · cos²(mean δ) + var(δ))
/// ```
///
/// Right ascensions are taken as offsets from the first position, wrapped into `(-π, π]`, so a
/// group straddling `α = 0` keeps its true spread.
///
/// Arguments
/// ---------
/// * `ra`, `dec`: positions in radians, same length
pub fn position_rms(ra: &[Radian], dec: &[Radian]) -> MilliArcSec {
    let Some(&ra0) = ra.first() else {
        return f64::NAN;
    };
    let ra_offsets: Vec<Radian> = ra.iter().map(|&a| wrap_angle_diff(a, ra0)).collect();
    let cos_dec = mean(dec).cos();
    rad_to_mas((variance(&ra_offsets) * cos_dec * cos_dec + variance(dec)).sqrt())
}

#[cfg(test)]
mod stats_test {
    use super::*;
    use crate::conversion::arcsec_to_rad;
    use approx::assert_relative_eq;

    #[test]
    fn test_moments() {
        let mags = [18.0, 18.2, 18.1];
        assert_relative_eq!(mean(&mags), 18.1, epsilon = 1e-12);
        assert_relative_eq!(std(&mags), (0.02_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert!(std(&mags) > 0.0);
        assert_eq!(std(&[4.0]), 0.0);
        assert!(mean(&[]).is_nan());
        assert!(std(&[]).is_nan());
    }

    #[test]
    fn test_median_and_percentiles() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
        assert!(median(&[1.0, f64::NAN]).is_nan());

        let values: Vec<f64> = (0..=10).map(f64::from).collect();
        assert_relative_eq!(percentile(&values, 25.0), 2.5);
        assert_relative_eq!(percentile(&values, 90.0), 9.0);
        assert_eq!(percentiles(&values, [0.0, 50.0, 100.0]), [0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_position_rms() {
        // Two positions 2 mas apart in declination: rms = 1 mas
        let dec0 = 0.3;
        let ra = [1.0, 1.0];
        let dec = [dec0, dec0 + arcsec_to_rad(0.002)];
        assert_relative_eq!(position_rms(&ra, &dec), 1.0, max_relative = 1e-9);

        // Right ascension offsets shrink with cos(dec)
        let ra = [1.0, 1.0 + arcsec_to_rad(0.002)];
        let dec = [dec0, dec0];
        assert_relative_eq!(position_rms(&ra, &dec), dec0.cos(), max_relative = 1e-9);

        assert_eq!(position_rms(&[1.0], &[0.5]), 0.0);
        assert!(position_rms(&[], &[]).is_nan());
    }

    #[test]
    fn test_position_rms_across_ra_zero() {
        // 1 mas on each side of α = 0, on the equator: 2 mas apart, rms = 1 mas
        let one_mas = arcsec_to_rad(0.001);
        let ra = [std::f64::consts::TAU - one_mas, one_mas];
        let dec = [0.0, 0.0];
        assert_relative_eq!(position_rms(&ra, &dec), 1.0, max_relative = 1e-5);

        let ra = [one_mas, std::f64::consts::TAU - one_mas, 0.0];
        assert!(position_rms(&ra, &[0.0; 3]) < 1.0);
    }
}
