use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use tracing::{info, warn};

use validate_drp::constants::{construct_data_ids, CcdId, CcdKey, DataId, VisitId};
use validate_drp::logging::setup_logging;
use validate_drp::repository::FileRepository;
use validate_drp::validate::{run, RunConfig};

/// Repeatability checks of single-visit processing across visits.
#[derive(Parser)]
#[command(name = "validate_drp")]
#[command(about = "Astrometric and photometric repeatability of a processed repository")]
struct Cli {
    /// Repository holding src_schema.csv, src/ and calexp_md/
    #[arg(long)]
    repo: Utf8PathBuf,

    /// Visits to compare, e.g. "849375,850587"
    #[arg(long, value_delimiter = ',', requires = "ccds")]
    visits: Vec<VisitId>,

    /// CCDs of each visit
    #[arg(long, value_delimiter = ',', requires = "visits")]
    ccds: Vec<CcdId>,

    /// Explicit data id, e.g. "visit=849375,ccdnum=12"; repeatable, used after visits × ccds
    #[arg(long = "data-id")]
    data_ids: Vec<DataId>,

    /// Name the CCD component "ccdnum" instead of "ccd"
    #[arg(long)]
    ccdnum: bool,

    /// JSON run configuration; command line values override it
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    #[arg(long)]
    good_mag_limit: Option<f64>,

    /// Median astrometric scatter reference (mas)
    #[arg(long)]
    astrom_ref: Option<f64>,

    /// Median photometric scatter reference (mmag)
    #[arg(long)]
    photo_ref: Option<f64>,

    /// Minimum number of matched objects
    #[arg(long)]
    match_ref: Option<usize>,

    #[arg(long)]
    output_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    no_plots: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn data_ids(&self) -> Result<Vec<DataId>> {
        let ccd_key = if self.ccdnum { CcdKey::CcdNum } else { CcdKey::Ccd };
        let mut ids = construct_data_ids(&self.visits, &self.ccds, ccd_key);
        ids.extend(self.data_ids.iter().copied());
        if ids.is_empty() {
            bail!("no data ids: give --visits and --ccds, or --data-id");
        }
        Ok(ids)
    }

    fn run_config(&self) -> Result<RunConfig> {
        let base = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("reading run configuration {path}"))?,
            None => RunConfig::default(),
        };

        let mut builder = RunConfig::builder().from_config(base);
        if let Some(v) = self.good_mag_limit {
            builder = builder.good_mag_limit(v);
        }
        if let Some(v) = self.astrom_ref {
            builder = builder.median_astrom_scatter_ref(v);
        }
        if let Some(v) = self.photo_ref {
            builder = builder.median_photo_scatter_ref(v);
        }
        if let Some(v) = self.match_ref {
            builder = builder.match_ref(v);
        }
        if let Some(dir) = &self.output_dir {
            builder = builder.output_dir(dir.clone());
        }
        if self.no_plots {
            builder = builder.write_plots(false);
        }
        Ok(builder.build()?)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    let config = cli.run_config()?;
    let data_ids = cli.data_ids()?;

    let repo = FileRepository::open(&cli.repo)
        .with_context(|| format!("opening repository {}", cli.repo))?;
    info!("validating {} data ids from {}", data_ids.len(), cli.repo);

    let outcome = run(&repo, &data_ids, &config)?;
    for plot in &outcome.plots {
        info!("wrote {plot}");
    }

    if outcome.checks_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("repeatability checks failed");
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(test)]
mod cli_test {
    use super::*;

    #[test]
    fn test_visits_times_ccds() {
        let cli = Cli::try_parse_from([
            "validate_drp", "--repo", "repo", "--visits", "1,2", "--ccds", "10,11", "--ccdnum",
        ])
        .unwrap();
        let ids = cli.data_ids().unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[1], DataId::new(1, 11).with_ccd_key(CcdKey::CcdNum));
    }

    #[test]
    fn test_explicit_data_ids() {
        let cli = Cli::try_parse_from([
            "validate_drp",
            "--repo",
            "repo",
            "--data-id",
            "visit=849375,ccd=12",
            "--data-id",
            "ccdnum=3, visit=850587",
        ])
        .unwrap();
        assert_eq!(
            cli.data_ids().unwrap(),
            vec![
                DataId::new(849375, 12),
                DataId::new(850587, 3).with_ccd_key(CcdKey::CcdNum),
            ]
        );
    }

    #[test]
    fn test_invalid_data_id_rejected() {
        assert!(Cli::try_parse_from(["validate_drp", "--repo", "repo", "--data-id", "visit=1"])
            .is_err());
        let cli = Cli::try_parse_from(["validate_drp", "--repo", "repo"]).unwrap();
        assert!(cli.data_ids().is_err());
    }
}
