//! # Catalog loading and cross-visit matching
//!
//! [`load_and_match_data`] is the first stage of a validation run. For each data id, in the
//! given order, it
//!
//! 1. reads the calibration metadata and builds a [`Calib`] tolerant of non-positive fluxes,
//! 2. reads the source catalog and fills the PSF magnitude columns,
//! 3. adds the calibrated catalog to a single [`MultiMatch`].
//!
//! The matcher is seeded with the repository schema extended with the magnitude fields.
//! Any missing dataset aborts the load: there is no partial result.
//!
//! With the `progress` feature, an [`indicatif`] bar tracks the catalogs.
use tracing::info;

use crate::catalog::calib::Calib;
use crate::constants::{ArcSec, DataId};
use crate::conversion::arcsec_to_rad;
use crate::matching::{GroupSet, GroupView, MultiMatch};
use crate::repository::DataRepository;
use crate::validate_errors::ValidateError;

#[cfg(feature = "progress")]
use crate::progress_bar::{fmt_dur, loading_bar, IterTimer};

/// Load, calibrate and match the catalogs of `data_ids`.
///
/// Arguments
/// ---------
/// * `repo`: where catalogs, metadata and schema are read from
/// * `data_ids`: visit/CCD identifiers, processed in order; the first one names the CCD key
/// * `match_radius`: match radius in arcseconds
/// * `remove_ambiguous`: drop objects involved in an ambiguous match
///
/// Return
/// ------
/// * the matched objects as a [`GroupView`]
/// * `Err(NoDataIds)` for an empty list, or the first data access error
pub fn load_and_match_data<R: DataRepository + ?Sized>(
    repo: &R,
    data_ids: &[DataId],
    match_radius: ArcSec,
    remove_ambiguous: bool,
) -> Result<GroupView, ValidateError> {
    let ccd_key = data_ids.first().ok_or(ValidateError::NoDataIds)?.ccd_key;

    if !(match_radius > 0.0 && match_radius.is_finite()) {
        return Err(ValidateError::InvalidParameter(format!(
            "match radius must be positive, got {match_radius} arcsec"
        )));
    }

    let schema = repo.schema()?.with_magnitude_fields();
    let mut mmatch = MultiMatch::new(schema, arcsec_to_rad(match_radius));

    #[cfg(feature = "progress")]
    let pb = loading_bar(data_ids.len());
    #[cfg(feature = "progress")]
    let mut timer = IterTimer::new(0.2);

    for data_id in data_ids {
        let metadata = repo.calib_metadata(data_id)?;
        let mut calib = Calib::from_metadata(&metadata, *data_id)?;
        calib.set_throw_on_negative_flux(false);

        let mut catalog = repo.source_catalog(data_id)?;
        catalog.calibrate(&calib)?;

        info!("{} sources in {}: {}", catalog.len(), ccd_key, data_id.ccd);
        mmatch.add(&catalog, *data_id)?;

        #[cfg(feature = "progress")]
        {
            let last = timer.tick();
            pb.set_message(format!(
                "{data_id}: {} sources, {} objects | {} (avg {})",
                catalog.len(),
                mmatch.number_of_objects(),
                fmt_dur(last),
                fmt_dur(timer.avg())
            ));
            pb.inc(1);
        }
    }

    #[cfg(feature = "progress")]
    pb.finish_and_clear();

    let groups = GroupView::build(mmatch.finish(remove_ambiguous));
    if let Some(stats) = groups.detection_count_stats() {
        info!(
            "{} matched objects, detections per object: {stats}",
            groups.number_of_groups()
        );
    }
    Ok(groups)
}

#[cfg(test)]
mod loader_test {
    use super::*;
    use crate::catalog::{Detection, Schema, SourceCatalog};
    use crate::repository::MemoryRepository;
    use approx::assert_relative_eq;

    fn repo(visits: &[u32]) -> MemoryRepository {
        let mut repo = MemoryRepository::new(Schema::minimal());
        for &visit in visits {
            let id = DataId::new(visit, 10);
            let offset = f64::from(visit) * 1.0e-7;
            let detections = vec![
                Detection::new(1, 1.0, 0.5 + offset, 1.0e4, 1.0e2, id),
                Detection::new(2, 1.1, 0.5, -10.0, 1.0, id),
            ];
            repo.insert_calibrated(SourceCatalog::new(Schema::minimal(), id, detections), 1.0e12, 0.0);
        }
        repo
    }

    #[test]
    fn test_load_and_match() {
        let repo = repo(&[1, 2, 3]);
        let ids: Vec<DataId> = [1, 2, 3].map(|v| DataId::new(v, 10)).to_vec();

        let groups = load_and_match_data(&repo, &ids, 1.0, true).unwrap();
        assert_eq!(groups.number_of_groups(), 2);
        assert_eq!(groups.total_detections(), 6);

        let first = &groups[&1];
        assert_relative_eq!(first[0].psf_mag, 20.0, epsilon = 1e-12);
        assert_eq!(first[2].data_id, DataId::new(3, 10));

        // Negative flux gives a NaN magnitude, not an error
        assert!(groups[&2][0].psf_mag.is_nan());
    }

    #[test]
    fn test_missing_visit_is_fatal() {
        let repo = repo(&[1, 2]);
        let ids = vec![DataId::new(1, 10), DataId::new(7, 10)];
        assert!(matches!(
            load_and_match_data(&repo, &ids, 1.0, true),
            Err(ValidateError::DatasetNotFound { data_id, .. }) if data_id == DataId::new(7, 10)
        ));
    }

    #[test]
    fn test_no_data_ids() {
        let repo = repo(&[1]);
        assert_eq!(
            load_and_match_data(&repo, &[], 1.0, true),
            Err(ValidateError::NoDataIds)
        );
        assert!(matches!(
            load_and_match_data(&repo, &[DataId::new(1, 10)], 0.0, true),
            Err(ValidateError::InvalidParameter(_))
        ));
    }
}
