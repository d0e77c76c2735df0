//! SVG plots of the repeatability metrics.
//!
//! Every function renders one figure to the given path and returns a
//! [`ValidateError::PlotError`] if the backend fails. Non-finite values are skipped.
use std::fmt::Display;

use camino::Utf8Path;
use plotters::prelude::*;

use crate::constants::{Magnitude, MilliArcSec, MilliMag};
use crate::srd::{AmxResult, Pa1Result, SrdLevel};
use crate::validate_errors::ValidateError;

const SIZE: (u32, u32) = (900, 620);
const SCATTER_COLOR: RGBColor = RGBColor(0, 102, 204);
const ERROR_COLOR: RGBColor = RGBColor(204, 102, 0);
const LIMIT_COLOR: RGBColor = RGBColor(34, 139, 34);

fn plot_err(e: impl Display) -> ValidateError {
    ValidateError::PlotError(e.to_string())
}

/// Finite bounds of a set of values, padded by 5 %; `(0, 1)` when nothing is finite.
fn padded_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 };
    (lo - pad, hi + pad)
}

fn finite_points<'a>(
    x: &'a [f64],
    y: &'a [f64],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
}

/// Scatter of a per-object quantity against magnitude, with the bright limit and reference.
fn magnitude_scatter(
    path: &Utf8Path,
    title: &str,
    y_desc: &str,
    mag: &[Magnitude],
    series: &[(&[f64], RGBColor, &str)],
    bright_limit: Magnitude,
    reference: f64,
) -> Result<(), ValidateError> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let (x_lo, x_hi) = padded_range(mag.iter().chain(std::iter::once(&bright_limit)));
    let (y_lo, y_hi) = padded_range(
        series
            .iter()
            .flat_map(|(values, _, _)| values.iter())
            .chain(std::iter::once(&reference)),
    );
    let y_lo = y_lo.min(0.0);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(65)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("PSF magnitude")
        .y_desc(y_desc)
        .light_line_style(WHITE)
        .draw()
        .map_err(plot_err)?;

    for (values, color, label) in series {
        let color = *color;
        chart
            .draw_series(finite_points(mag, values).map(|p| Circle::new(p, 3, color.filled())))
            .map_err(plot_err)?
            .label(*label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    chart
        .draw_series(LineSeries::new(
            [(bright_limit, y_lo), (bright_limit, y_hi)],
            LIMIT_COLOR.stroke_width(2),
        ))
        .map_err(plot_err)?
        .label(format!("mag <= {bright_limit:.1}"))
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], LIMIT_COLOR));

    chart
        .draw_series(LineSeries::new(
            [(x_lo, reference), (x_hi, reference)],
            BLACK.stroke_width(1),
        ))
        .map_err(plot_err)?
        .label(format!("reference {reference:.1}"))
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], BLACK));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

/// Astrometric scatter versus magnitude.
pub fn plot_astrometry(
    path: &Utf8Path,
    mag: &[Magnitude],
    dist: &[MilliArcSec],
    bright_limit: Magnitude,
    median_ref: MilliArcSec,
) -> Result<(), ValidateError> {
    magnitude_scatter(
        path,
        "Astrometric repeatability",
        "Distance RMS [mas]",
        mag,
        &[(dist, SCATTER_COLOR, "position RMS")],
        bright_limit,
        median_ref,
    )
}

/// Photometric scatter and median error versus magnitude.
pub fn plot_photometry(
    path: &Utf8Path,
    mag: &[Magnitude],
    mmag_rms: &[MilliMag],
    mmag_err: &[MilliMag],
    bright_limit: Magnitude,
    median_ref: MilliMag,
) -> Result<(), ValidateError> {
    magnitude_scatter(
        path,
        "Photometric repeatability",
        "Magnitude scatter [mmag]",
        mag,
        &[
            (mmag_rms, SCATTER_COLOR, "RMS scatter"),
            (mmag_err, ERROR_COLOR, "median error"),
        ],
        bright_limit,
        median_ref,
    )
}

/// Random-pair magnitude differences of the last PA1 draw versus magnitude.
pub fn plot_pa1(path: &Utf8Path, pa1: &Pa1Result) -> Result<(), ValidateError> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let (x_lo, x_hi) = padded_range(&pa1.mags);
    let (y_lo, y_hi) = padded_range(&pa1.diffs);
    let y_max = y_lo.abs().max(y_hi.abs());

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "PA1: RMS = {:.2} mmag, IQR = {:.2} mmag",
                pa1.rms_mean, pa1.iqr_mean
            ),
            ("sans-serif", 24),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(65)
        .build_cartesian_2d(x_lo..x_hi, -y_max..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("PSF magnitude")
        .y_desc("Random pair difference / sqrt(2) [mmag]")
        .light_line_style(WHITE)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            finite_points(&pa1.mags, &pa1.diffs)
                .map(|p| Circle::new(p, 3, SCATTER_COLOR.filled())),
        )
        .map_err(plot_err)?;

    for sign in [-1.0, 1.0] {
        let y = sign * pa1.iqr_mean;
        if y.is_finite() {
            chart
                .draw_series(LineSeries::new(
                    [(x_lo, y), (x_hi, y)],
                    LIMIT_COLOR.stroke_width(2),
                ))
                .map_err(plot_err)?;
        }
    }

    root.present().map_err(plot_err)
}

/// Histogram of the per-pair distance scatters of an AMx metric.
pub fn plot_amx(path: &Utf8Path, amx: &AmxResult) -> Result<(), ValidateError> {
    const N_BINS: usize = 30;

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let levels: Vec<f64> = SrdLevel::ALL.iter().map(|l| l.amx()).collect();
    let (_, x_hi) = padded_range(amx.rms_distances.iter().chain(levels.iter()));
    let x_hi = x_hi.max(1.0);
    let width = x_hi / N_BINS as f64;

    let mut counts = [0u32; N_BINS];
    for &v in amx.rms_distances.iter().filter(|v| v.is_finite()) {
        let bin = ((v / width) as usize).min(N_BINS - 1);
        counts[bin] += 1;
    }
    let y_hi = f64::from(counts.iter().copied().max().unwrap_or(0).max(1)) * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{}: {:.2} mas", amx.plot_stem(), amx.amx),
            ("sans-serif", 24),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(65)
        .build_cartesian_2d(0.0..x_hi, 0.0..y_hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Distance RMS [mas]")
        .y_desc("Pairs")
        .light_line_style(WHITE)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &n)| {
            let x0 = i as f64 * width;
            Rectangle::new([(x0, 0.0), (x0 + width, f64::from(n))], SCATTER_COLOR.filled())
        }))
        .map_err(plot_err)?;

    let mut markers: Vec<(f64, RGBColor)> = levels
        .iter()
        .map(|&level| (level, LIMIT_COLOR))
        .collect();
    if amx.amx.is_finite() {
        markers.push((amx.amx, ERROR_COLOR));
    }
    for (x, color) in markers {
        chart
            .draw_series(LineSeries::new(
                [(x, 0.0), (x, y_hi)],
                color.stroke_width(2),
            ))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)
}

#[cfg(test)]
mod plot_test {
    use super::*;

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(&Vec::<f64>::new()), (0.0, 1.0));
        assert_eq!(padded_range(&[f64::NAN]), (0.0, 1.0));
        assert_eq!(padded_range(&[2.0]), (1.5, 2.5));
        let (lo, hi) = padded_range(&[0.0, 10.0, f64::INFINITY]);
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_finite_points() {
        let x = [1.0, f64::NAN, 3.0];
        let y = [1.0, 2.0, f64::INFINITY];
        assert_eq!(finite_points(&x, &y).collect::<Vec<_>>(), vec![(1.0, 1.0)]);
    }
}
