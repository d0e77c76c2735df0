//! Human-readable console report.
//!
//! The wording of every line is fixed so that two runs on the same data print the same text.
//! The final summary is a [`comfy_table`] table with one row per threshold comparison.
use std::fmt::Write;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, ContentArrangement, Row, Table};

use crate::checks::{CheckOutcome, ThresholdReport};
use crate::srd::{AmxResult, Pa1Result, Pa2Result};

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Text of one threshold check.
pub fn check_text(outcome: &CheckOutcome) -> String {
    let name = &outcome.name;
    let unit = &outcome.unit;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Median value of the {name} scatter - all magnitudes: {:.3} {unit}",
        outcome.median_all
    );
    let _ = writeln!(
        out,
        "{} scatter (median) - mag <= {:.1} : {:.1} {unit}",
        capitalize(name),
        outcome.bright_limit,
        outcome.scatter.value
    );
    if !outcome.scatter.passed {
        let _ = writeln!(
            out,
            "Median {name} scatter {:.1} {unit} is larger than reference : {:.1} {unit}",
            outcome.scatter.value, outcome.scatter.reference
        );
    }
    if !outcome.matches.passed {
        let _ = writeln!(
            out,
            "Number of matched sources {:.0} is too small (should be >= {:.0})",
            outcome.matches.value, outcome.matches.reference
        );
    }
    out
}

pub fn pa1_text(pa1: &Pa1Result) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "PA1(RMS) = {:4.2}+-{:4.2} mmag ({} random shuffles)",
        pa1.rms_mean, pa1.rms_std, pa1.n_shuffles
    );
    let _ = writeln!(
        out,
        "PA1(IQR) = {:4.2}+-{:4.2} mmag",
        pa1.iqr_mean, pa1.iqr_std
    );
    out
}

pub fn pa2_text(pa2: &[Pa2Result]) -> String {
    let mut out = String::new();
    for level in pa2 {
        let _ = writeln!(
            out,
            "{:>7}: PF1 = {:2.0}% of diffs more than PA2 = {:4.2} mmag (target is PA2 < {:2.0} mmag)",
            level.level.to_string(),
            level.pf1,
            level.pa2,
            level.report.reference
        );
    }
    out
}

pub fn amx_text(amx: &AmxResult) -> String {
    let (lo, hi) = amx.params.mag_range;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} = {:4.2} mas over {} pairs (D = {:.0} arcmin, {lo:.1} < mag < {hi:.1})",
        amx.params.name,
        amx.amx,
        amx.rms_distances.len(),
        amx.params.d
    );
    for (level, report) in amx.reports() {
        let verdict = if report.passed { "meets" } else { "does not meet" };
        let _ = writeln!(
            out,
            "  {verdict} the {level} requirement ({} < {:.0} mas)",
            amx.params.name, report.reference
        );
    }
    out
}

/// Table of threshold comparisons.
pub fn summary_table<'a, I>(reports: I) -> Table
where
    I: IntoIterator<Item = &'a ThresholdReport>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Metric"),
        Cell::new("Value"),
        Cell::new("Reference"),
        Cell::new("Unit"),
        Cell::new("Status"),
    ]);

    for report in reports {
        let status = if report.passed {
            Cell::new("PASS").fg(Color::Green)
        } else {
            Cell::new("FAIL").fg(Color::Red)
        };
        table.add_row(Row::from(vec![
            Cell::new(&report.metric),
            Cell::new(format!("{:.2}", report.value)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", report.reference)).set_alignment(CellAlignment::Right),
            Cell::new(&report.unit),
            status,
        ]));
    }

    table
}

#[cfg(test)]
mod console_test {
    use super::*;
    use crate::checks::check_astrometry;

    #[test]
    fn test_check_text() {
        let outcome = check_astrometry(&[17.0, 18.0], &[30.0, 30.0], 100, 21.0, 25.0, 500);
        let text = check_text(&outcome);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Median value of the astrometric scatter - all magnitudes: 30.000 mas",
                "Astrometric scatter (median) - mag <= 21.0 : 30.0 mas",
                "Median astrometric scatter 30.0 mas is larger than reference : 25.0 mas",
                "Number of matched sources 100 is too small (should be >= 500)",
            ]
        );

        let passing = check_astrometry(&[17.0], &[10.0], 600, 21.0, 25.0, 500);
        assert_eq!(check_text(&passing).lines().count(), 2);
    }

    #[test]
    fn test_summary_table() {
        let reports = [
            ThresholdReport::at_most("PA1 (design)", 4.0, 5.0, "mmag"),
            ThresholdReport::at_least("Matched objects", 10.0, 500.0, ""),
        ];
        let rendered = summary_table(&reports).to_string();
        assert!(rendered.contains("PA1 (design)"));
        assert!(rendered.contains("PASS"));
        assert!(rendered.contains("FAIL"));
        assert!(rendered.contains("500.00"));
    }
}
