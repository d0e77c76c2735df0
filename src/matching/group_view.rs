//! # Group view of a matched catalog
//!
//! A [`GroupView`] is the matched catalog re-expressed as an ordered mapping
//! `object id → Group`, with ascending object ids. Each [`Group`] holds the member
//! [`Detection`]s of one matched object in the order they were added to the matcher.
//!
//! The view is never mutated in place: [`GroupSet::filter`] returns a new view holding the
//! surviving groups untouched, and the reductions ([`GroupSet::aggregate`],
//! [`GroupSet::aggregate_field`]) produce one value per group in ascending id order.
//!
//! See also
//! ------------
//! * [`MultiMatch`](crate::matching::MultiMatch) – Produces the [`MatchedCatalog`] consumed by
//!   [`GroupSet::build`].
//! * [`crate::analysis`] – Quality filters and summary statistics built on this view.
use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

use super::MatchedCatalog;
use crate::catalog::{Detection, Field};
use crate::constants::ObjectId;

/// Detections of one matched object; most objects have at most a handful of visits.
pub type Group = SmallVec<[Detection; 8]>;

/// Ordered mapping from object id to its group.
pub type GroupView = BTreeMap<ObjectId, Group>;

/// Values of one field over the members of a group.
#[inline]
pub fn field_values(group: &Group, field: Field) -> Vec<f64> {
    group.iter().map(|det| det.get(field)).collect()
}

/// Summary statistics of the number of detections per group.
///
/// Quantiles use the nearest-rank convention on the sorted sizes:
/// index `round(q · (n − 1))`.
///
/// Display
/// -----------------
/// * `format!("{}", stats)` – single line, e.g. `min=2, p25=3, median=4, p95=6, max=6`
/// * `format!("{:#}", stats)` – aligned multi-line block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSizeStats {
    pub min: usize,
    pub p25: usize,
    pub median: usize,
    pub p95: usize,
    pub max: usize,
}

impl fmt::Display for GroupSizeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Detections per matched object - summary")?;
            writeln!(f, "---------------------------------------")?;
            writeln!(f, "min    : {}", self.min)?;
            writeln!(f, "p25    : {}", self.p25)?;
            writeln!(f, "median : {}", self.median)?;
            writeln!(f, "p95    : {}", self.p95)?;
            write!(f, "max    : {}", self.max)
        } else {
            write!(
                f,
                "min={}, p25={}, median={}, p95={}, max={}",
                self.min, self.p25, self.median, self.p95, self.max
            )
        }
    }
}

pub trait GroupSet: Sized {
    /// Group the rows of a matched catalog by object id.
    ///
    /// Rows keep their relative order inside each group.
    fn build(catalog: MatchedCatalog) -> Self;

    /// Keep the groups for which `predicate` holds.
    ///
    /// Groups are cloned unchanged: membership is never altered by filtering.
    fn filter<F>(&self, predicate: F) -> Self
    where
        F: FnMut(&Group) -> bool;

    /// Apply a reduction to every group, in ascending object id order.
    fn aggregate<F>(&self, reducer: F) -> Vec<f64>
    where
        F: FnMut(&Group) -> f64;

    /// Reduce one field of every group, in ascending object id order.
    ///
    /// Arguments
    /// ---------
    /// * `field`: the per-detection field to collect
    /// * `reducer`: reduction applied to the field values of one group (e.g. a mean)
    fn aggregate_field<F>(&self, field: Field, reducer: F) -> Vec<f64>
    where
        F: FnMut(&[f64]) -> f64;

    fn number_of_groups(&self) -> usize;

    /// Total number of detections over all groups.
    fn total_detections(&self) -> usize;

    /// Distribution of group sizes, `None` for an empty view.
    fn detection_count_stats(&self) -> Option<GroupSizeStats>;
}

impl GroupSet for GroupView {
    fn build(catalog: MatchedCatalog) -> Self {
        let mut view = GroupView::new();
        for row in catalog.rows {
            view.entry(row.object_id).or_default().push(row.detection);
        }
        view
    }

    fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Group) -> bool,
    {
        self.iter()
            .filter(|(_, group)| predicate(group))
            .map(|(id, group)| (*id, group.clone()))
            .collect()
    }

    fn aggregate<F>(&self, mut reducer: F) -> Vec<f64>
    where
        F: FnMut(&Group) -> f64,
    {
        self.values().map(|group| reducer(group)).collect()
    }

    fn aggregate_field<F>(&self, field: Field, mut reducer: F) -> Vec<f64>
    where
        F: FnMut(&[f64]) -> f64,
    {
        self.values()
            .map(|group| reducer(&field_values(group, field)))
            .collect()
    }

    #[inline]
    fn number_of_groups(&self) -> usize {
        self.len()
    }

    #[inline]
    fn total_detections(&self) -> usize {
        self.values().map(|group| group.len()).sum()
    }

    fn detection_count_stats(&self) -> Option<GroupSizeStats> {
        let mut counts: Vec<usize> = self.values().map(|group| group.len()).collect();
        if counts.is_empty() {
            return None;
        }
        counts.sort_unstable();

        let n = counts.len();
        let q_index = |q: f64| -> usize {
            let idx = (q * (n as f64 - 1.0)).round() as isize;
            idx.clamp(0, n as isize - 1) as usize
        };

        Some(GroupSizeStats {
            min: counts[0],
            p25: counts[q_index(0.25)],
            median: counts[q_index(0.50)],
            p95: counts[q_index(0.95)],
            max: counts[n - 1],
        })
    }
}
