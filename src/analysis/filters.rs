//! Quality filters over matched objects.
//!
//! Two predicate passes, applied in sequence by [`analyze_data`](super::analyze_data):
//!
//! 1. [`is_good_group`] – enough detections, no disqualifying pixel flag, finite magnitudes.
//! 2. [`is_safe_group`] – bright and stellar: mean magnitude within the limit and
//!    extendedness strictly below the galaxy threshold.
//!
//! Both are pure: a group either survives whole or is dropped.
use super::stats::mean;
use super::AnalysisParams;
use crate::catalog::Field;
use crate::matching::group_view::{field_values, Group, GroupSet, GroupView};

/// `true` for a group usable for repeatability statistics.
pub fn is_good_group(group: &Group, params: &AnalysisParams) -> bool {
    group.len() >= params.n_matches_required
        && group
            .iter()
            .all(|det| !det.flags.any() && det.psf_mag.is_finite())
}

/// `true` for a bright, point-like group.
pub fn is_safe_group(group: &Group, params: &AnalysisParams) -> bool {
    let mean_mag = mean(&field_values(group, Field::PsfMag));
    let max_extended = group
        .iter()
        .map(|det| det.extendedness)
        .fold(f64::NEG_INFINITY, f64::max);

    mean_mag <= params.good_mag_limit && max_extended < params.safe_max_extended
}

pub fn good_filter(groups: &GroupView, params: &AnalysisParams) -> GroupView {
    groups.filter(|g| is_good_group(g, params))
}

pub fn safe_filter(groups: &GroupView, params: &AnalysisParams) -> GroupView {
    groups.filter(|g| is_safe_group(g, params))
}

#[cfg(test)]
mod filters_test {
    use super::*;
    use crate::catalog::{Detection, PixelFlags};
    use crate::constants::DataId;
    use smallvec::smallvec;

    fn det(mag: f64) -> Detection {
        Detection::new(1, 0.1, 0.1, 1.0, 0.1, DataId::new(1, 1)).with_magnitude(mag, 0.01)
    }

    fn view(groups: Vec<Group>) -> GroupView {
        groups
            .into_iter()
            .enumerate()
            .map(|(i, g)| (i as u64 + 1, g))
            .collect()
    }

    #[test]
    fn test_good_filter() {
        let params = AnalysisParams::default();
        let flagged = det(18.0).with_flags(PixelFlags {
            saturated: true,
            ..Default::default()
        });

        let groups = view(vec![
            smallvec![det(18.0)],
            smallvec![det(18.0), det(18.2), det(18.1)],
            smallvec![det(18.0), flagged, det(18.1)],
            smallvec![det(18.0), det(f64::NAN)],
            smallvec![det(18.0), det(f64::INFINITY)],
        ]);

        let good = good_filter(&groups, &params);
        assert_eq!(good.keys().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_every_flag_disqualifies() {
        let params = AnalysisParams::default();
        let all_flags = [
            PixelFlags { saturated: true, ..Default::default() },
            PixelFlags { cr: true, ..Default::default() },
            PixelFlags { bad: true, ..Default::default() },
            PixelFlags { edge: true, ..Default::default() },
        ];
        for flags in all_flags {
            let group: Group = smallvec![det(17.0), det(17.1).with_flags(flags), det(17.0)];
            assert!(!is_good_group(&group, &params));
        }
    }

    #[test]
    fn test_safe_filter_is_idempotent() {
        let params = AnalysisParams::default();
        let groups = view(vec![
            smallvec![det(18.0), det(18.2), det(18.1)],
            smallvec![det(20.0), det(20.2)],
            smallvec![det(18.0), det(18.1).with_extendedness(1.0)],
            smallvec![det(19.5), det(19.5).with_extendedness(0.99)],
        ]);

        let safe = safe_filter(&groups, &params);
        assert_eq!(safe.keys().copied().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(safe_filter(&safe, &params), safe);
    }
}
