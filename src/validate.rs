//! # Validation run
//!
//! [`run`] chains the whole pipeline on a repository:
//!
//! ```text
//! load & match → filter → summarize → check → SRD metrics → report
//! ```
//!
//! The sequence never branches nor retries: the first error aborts the run. Statistical
//! degeneracies (no surviving object) are not errors; they show up as failed checks and
//! `NaN` metrics.
//!
//! ## Configuration
//! -----------------
//! [`RunConfig`] gathers every knob of a run. It can be built in code through
//! [`RunConfigBuilder`] or read from a JSON file where every field is optional:
//!
//! ```json
//! { "good_mag_limit": 21.0, "match_ref": 500, "write_plots": false }
//! ```
//!
//! The `good_mag_limit` given by the caller drives both the safe filter and the bright
//! limit of the checks.
use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{analyze_data, AnalysisParams, MatchSummary};
use crate::checks::{check_astrometry, check_photometry, CheckOutcome, ThresholdReport};
use crate::constants::{
    ArcSec, DataId, Magnitude, MilliArcSec, MilliMag, DEFAULT_MATCH_RADIUS, MATCH_REF,
    MEDIAN_ASTROM_SCATTER_REF, MEDIAN_PHOTO_SCATTER_REF, RUN_GOOD_MAG_LIMIT,
};
use crate::loader::load_and_match_data;
use crate::matching::GroupView;
use crate::report::console::{amx_text, check_text, pa1_text, pa2_text, summary_table};
use crate::report::plot::{plot_amx, plot_astrometry, plot_pa1, plot_photometry};
use crate::report::plot_path;
use crate::repository::DataRepository;
use crate::srd::{calc_am1, calc_am2, calc_pa1, calc_pa2, AmxResult, Pa1Result, Pa2Result};
use crate::validate_errors::ValidateError;

pub use crate::report::repo_name_to_prefix;

/// Parameters of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Faintest mean magnitude of the safe objects and bright limit of the checks
    pub good_mag_limit: Magnitude,
    pub median_astrom_scatter_ref: MilliArcSec,
    pub median_photo_scatter_ref: MilliMag,
    pub match_ref: usize,
    pub match_radius: ArcSec,
    pub remove_ambiguous: bool,
    pub num_random_shuffles: usize,
    pub seed: u64,
    pub output_dir: Utf8PathBuf,
    pub write_plots: bool,
    /// Print the text report on stdout
    pub print_report: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            good_mag_limit: RUN_GOOD_MAG_LIMIT,
            median_astrom_scatter_ref: MEDIAN_ASTROM_SCATTER_REF,
            median_photo_scatter_ref: MEDIAN_PHOTO_SCATTER_REF,
            match_ref: MATCH_REF,
            match_radius: DEFAULT_MATCH_RADIUS,
            remove_ambiguous: true,
            num_random_shuffles: 50,
            seed: 42,
            output_dir: Utf8PathBuf::from("."),
            write_plots: true,
            print_report: true,
        }
    }
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }

    /// Read a JSON configuration; missing fields take their default value.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ValidateError> {
        let reader = BufReader::new(File::open(path)?);
        let config: RunConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidateError> {
        if !self.good_mag_limit.is_finite() {
            return Err(ValidateError::InvalidParameter(
                "good_mag_limit must be finite".into(),
            ));
        }
        if !(self.median_astrom_scatter_ref >= 0.0 && self.median_photo_scatter_ref >= 0.0) {
            return Err(ValidateError::InvalidParameter(
                "median scatter references must be non-negative".into(),
            ));
        }
        if !(self.match_radius > 0.0 && self.match_radius.is_finite()) {
            return Err(ValidateError::InvalidParameter(
                "match_radius must be positive".into(),
            ));
        }
        if self.num_random_shuffles == 0 {
            return Err(ValidateError::InvalidParameter(
                "num_random_shuffles must be >= 1".into(),
            ));
        }
        Ok(())
    }

    fn analysis_params(&self) -> Result<AnalysisParams, ValidateError> {
        AnalysisParams::builder()
            .good_mag_limit(self.good_mag_limit)
            .build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
        }
    }

    /// Start from an existing configuration instead of the defaults.
    pub fn from_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn good_mag_limit(mut self, v: Magnitude) -> Self {
        self.config.good_mag_limit = v;
        self
    }
    pub fn median_astrom_scatter_ref(mut self, v: MilliArcSec) -> Self {
        self.config.median_astrom_scatter_ref = v;
        self
    }
    pub fn median_photo_scatter_ref(mut self, v: MilliMag) -> Self {
        self.config.median_photo_scatter_ref = v;
        self
    }
    pub fn match_ref(mut self, v: usize) -> Self {
        self.config.match_ref = v;
        self
    }
    pub fn match_radius(mut self, v: ArcSec) -> Self {
        self.config.match_radius = v;
        self
    }
    pub fn remove_ambiguous(mut self, v: bool) -> Self {
        self.config.remove_ambiguous = v;
        self
    }
    pub fn num_random_shuffles(mut self, v: usize) -> Self {
        self.config.num_random_shuffles = v;
        self
    }
    pub fn seed(mut self, v: u64) -> Self {
        self.config.seed = v;
        self
    }
    pub fn output_dir(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.config.output_dir = v.into();
        self
    }
    pub fn write_plots(mut self, v: bool) -> Self {
        self.config.write_plots = v;
        self
    }
    pub fn print_report(mut self, v: bool) -> Self {
        self.config.print_report = v;
        self
    }

    pub fn build(self) -> Result<RunConfig, ValidateError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Everything a run computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub summary: MatchSummary,
    pub safe_matches: GroupView,
    pub astrometry: CheckOutcome,
    pub photometry: CheckOutcome,
    pub pa1: Pa1Result,
    pub pa2: Vec<Pa2Result>,
    pub am1: AmxResult,
    pub am2: AmxResult,
    /// Plot files written by the run
    pub plots: Vec<Utf8PathBuf>,
}

impl ValidationOutcome {
    /// Both threshold checks passed.
    pub fn checks_passed(&self) -> bool {
        self.astrometry.passed() && self.photometry.passed()
    }

    /// Every threshold comparison of the run, checks first then SRD metrics.
    pub fn threshold_reports(&self) -> Vec<ThresholdReport> {
        let mut reports: Vec<ThresholdReport> = self
            .astrometry
            .reports()
            .into_iter()
            .chain(self.photometry.reports())
            .cloned()
            .collect();
        reports.extend(self.pa1.reports().into_iter().map(|(_, r)| r));
        reports.extend(self.pa2.iter().map(|p| p.report.clone()));
        reports.extend(self.am1.reports().into_iter().map(|(_, r)| r));
        reports.extend(self.am2.reports().into_iter().map(|(_, r)| r));
        reports
    }

    /// Console text of the run.
    pub fn report_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&check_text(&self.astrometry));
        out.push_str(&check_text(&self.photometry));
        out.push_str(&pa1_text(&self.pa1));
        out.push_str(&pa2_text(&self.pa2));
        out.push_str(&amx_text(&self.am1));
        out.push_str(&amx_text(&self.am2));
        out.push_str(&summary_table(&self.threshold_reports()).to_string());
        out.push('\n');
        out
    }
}

/// Run the full validation.
///
/// Arguments
/// ---------
/// * `repo`: the data repository
/// * `data_ids`: visit/CCD identifiers to compare
/// * `config`: thresholds, references and output options
///
/// Return
/// ------
/// * the [`ValidationOutcome`]; failed checks are reported in it, not as errors
pub fn run<R: DataRepository + ?Sized>(
    repo: &R,
    data_ids: &[DataId],
    config: &RunConfig,
) -> Result<ValidationOutcome, ValidateError> {
    config.validate()?;
    let params = config.analysis_params()?;

    let all_matches =
        load_and_match_data(repo, data_ids, config.match_radius, config.remove_ambiguous)?;
    let (summary, safe_matches) = analyze_data(&all_matches, &params);

    let mmag_rms = summary.mmag_rms();
    let astrometry = check_astrometry(
        &summary.mag,
        &summary.dist,
        summary.match_count,
        config.good_mag_limit,
        config.median_astrom_scatter_ref,
        config.match_ref,
    );
    let photometry = check_photometry(
        &summary.mag,
        &mmag_rms,
        summary.match_count,
        config.good_mag_limit,
        config.median_photo_scatter_ref,
        config.match_ref,
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let pa1 = calc_pa1(&safe_matches, config.num_random_shuffles, &mut rng)?;
    let pa2 = calc_pa2(&safe_matches, &mut rng);
    let am1 = calc_am1(&safe_matches)?;
    let am2 = calc_am2(&safe_matches)?;

    let mut outcome = ValidationOutcome {
        summary,
        safe_matches,
        astrometry,
        photometry,
        pa1,
        pa2,
        am1,
        am2,
        plots: Vec::new(),
    };

    if config.write_plots {
        let prefix = repo.location().map(|p| repo_name_to_prefix(p.as_str()));
        outcome.plots = write_plots(&outcome, config, prefix.as_deref().unwrap_or(""))?;
    }

    if config.print_report {
        print!("{}", outcome.report_text());
    }

    info!(
        "validation finished on {} data ids: astrometry {}, photometry {}",
        data_ids.len(),
        if outcome.astrometry.passed() { "passed" } else { "failed" },
        if outcome.photometry.passed() { "passed" } else { "failed" },
    );
    Ok(outcome)
}

fn write_plots(
    outcome: &ValidationOutcome,
    config: &RunConfig,
    prefix: &str,
) -> Result<Vec<Utf8PathBuf>, ValidateError> {
    std::fs::create_dir_all(&config.output_dir)?;
    let dir = config.output_dir.as_path();
    let summary = &outcome.summary;

    let astrom = plot_path(dir, prefix, "check_astrometry");
    plot_astrometry(
        &astrom,
        &summary.mag,
        &summary.dist,
        config.good_mag_limit,
        config.median_astrom_scatter_ref,
    )?;

    let photom = plot_path(dir, prefix, "check_photometry");
    plot_photometry(
        &photom,
        &summary.mag,
        &summary.mmag_rms(),
        &summary.mmag_err(),
        config.good_mag_limit,
        config.median_photo_scatter_ref,
    )?;

    let pa1 = plot_path(dir, prefix, "PA1");
    plot_pa1(&pa1, &outcome.pa1)?;

    let am1 = plot_path(dir, prefix, &outcome.am1.plot_stem());
    plot_amx(&am1, &outcome.am1)?;
    let am2 = plot_path(dir, prefix, &outcome.am2.plot_stem());
    plot_amx(&am2, &outcome.am2)?;

    let plots = vec![astrom, photom, pa1, am1, am2];
    info!("wrote {} plots to {}", plots.len(), dir);
    Ok(plots)
}
