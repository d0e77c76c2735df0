//! # Reporting
//!
//! Output artifacts of a validation run:
//!
//! * [`console`] – fixed-wording text per check and SRD metric, and a summary table.
//! * [`plot`] – SVG figures, one per check and metric.
//!
//! Plot files are named `<prefix>_<stem>.svg`, where the prefix is derived from the
//! repository location by [`repo_name_to_prefix`] so that runs on different repositories
//! do not overwrite each other's figures.
use camino::{Utf8Path, Utf8PathBuf};

pub mod console;
pub mod plot;

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Flatten a repository path into a file name prefix.
///
/// Leading dots are removed, then leading and trailing path separators, and the remaining
/// separators become underscores: `./data/repo/` → `data_repo`.
pub fn repo_name_to_prefix(repo: &str) -> String {
    repo.trim_start_matches('.')
        .trim_matches(&SEPARATORS[..])
        .replace(&SEPARATORS[..], "_")
}

/// Path of a plot file inside `dir`.
pub fn plot_path(dir: &Utf8Path, prefix: &str, stem: &str) -> Utf8PathBuf {
    if prefix.is_empty() {
        dir.join(format!("{stem}.svg"))
    } else {
        dir.join(format!("{prefix}_{stem}.svg"))
    }
}

#[cfg(test)]
mod report_test {
    use super::*;

    #[test]
    fn test_repo_name_to_prefix() {
        assert_eq!(repo_name_to_prefix("./data/repo/"), "data_repo");
        assert_eq!(repo_name_to_prefix("../CFHT/output"), "CFHT_output");
        assert_eq!(repo_name_to_prefix("/home/user/repo"), "home_user_repo");
        assert_eq!(repo_name_to_prefix("repo"), "repo");
        assert_eq!(repo_name_to_prefix("."), "");
    }

    #[test]
    fn test_plot_path() {
        let dir = Utf8Path::new("out");
        assert_eq!(
            plot_path(dir, "data_repo", "check_astrometry"),
            "out/data_repo_check_astrometry.svg"
        );
        assert_eq!(plot_path(dir, "", "PA1"), "out/PA1.svg");
    }
}
