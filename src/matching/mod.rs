//! # Cross-visit matching
//!
//! Coalesce the detections of successive visit/CCD catalogs into **matched objects**:
//! detections closer than a fixed angular radius are assumed to be the same star.
//!
//! ## Protocol
//! -----------------
//! The matcher is an accumulating builder:
//!
//! ```rust, no_run
//! use validate_drp::matching::{GroupSet, GroupView, MultiMatch};
//! # fn demo(schema: validate_drp::catalog::Schema,
//! #         catalogs: Vec<validate_drp::catalog::SourceCatalog>)
//! #         -> Result<(), validate_drp::validate_errors::ValidateError> {
//! let mut mm = MultiMatch::new(schema, 1.0_f64.to_radians() / 3600.0);
//! for cat in &catalogs {
//!     mm.add(cat, cat.data_id)?;
//! }
//! let matched = mm.finish(true);
//! let groups = GroupView::build(matched);
//! # Ok(()) }
//! ```
//!
//! `finish` consumes the builder: a partially matched state is never observable.
//!
//! ## Algorithm
//! -----------------
//! * Every object keeps a **reference position**, the position of its first detection.
//! * When a catalog is added, every existing object claims the **closest** new detection whose
//!   great-circle separation to the reference is `<= radius`. Candidates are found with a
//!   declination-sorted sweep: only detections with `|δ - δ_ref| <= radius` are examined.
//! * A new detection claimed by no object starts a new object. Object ids are assigned
//!   sequentially from 1, in add order then catalog row order, so the result is reproducible
//!   for a stable add order.
//! * A detection claimed by one object joins it. A detection claimed by several objects joins
//!   the nearest one (ties: lowest object id) and **all** claiming objects are flagged
//!   ambiguous; [`MultiMatch::finish`] can drop them.
//!
//! The radius is a hard threshold: positional uncertainties play no role.
use nalgebra::Vector3;
use tracing::debug;

use crate::catalog::{Detection, Schema, SourceCatalog};
use crate::constants::{DataId, ObjectId, Radian};
use crate::conversion::{separation_between, unit_vector};
use crate::validate_errors::ValidateError;

pub mod group_view;

pub use group_view::{Group, GroupSet, GroupSizeStats, GroupView};

/// One row of the matched catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedRow {
    pub object_id: ObjectId,
    pub detection: Detection,
}

/// Output of the matcher: every retained detection tagged with its object id.
///
/// Rows are ordered by object id, then by add order inside an object.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedCatalog {
    pub schema: Schema,
    pub rows: Vec<MatchedRow>,
}

impl MatchedCatalog {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchedRow> {
        self.rows.iter()
    }
}

#[derive(Debug, Clone)]
struct MatchedObject {
    ref_dec: Radian,
    ref_vec: Vector3<f64>,
    members: Vec<Detection>,
    ambiguous: bool,
}

/// Incremental cross-visit matcher.
#[derive(Debug, Clone)]
pub struct MultiMatch {
    schema: Schema,
    radius: Radian,
    objects: Vec<MatchedObject>,
    n_catalogs: usize,
}

impl MultiMatch {
    /// New matcher.
    ///
    /// Arguments
    /// ---------
    /// * `schema`: the schema every added catalog must be compatible with
    /// * `radius`: match radius in radians
    pub fn new(schema: Schema, radius: Radian) -> Self {
        MultiMatch {
            schema,
            radius,
            objects: Vec::new(),
            n_catalogs: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn radius(&self) -> Radian {
        self.radius
    }

    /// Number of objects known so far, ambiguous ones included.
    pub fn number_of_objects(&self) -> usize {
        self.objects.len()
    }

    /// Match one catalog against the objects accumulated so far.
    ///
    /// Arguments
    /// ---------
    /// * `catalog`: the calibrated detections of one visit/CCD
    /// * `data_id`: provenance tag stamped on every detection of `catalog`
    ///
    /// Return
    /// ------
    /// * `Err(SchemaMismatch)` if `catalog.schema` is not compatible with the seeded schema
    pub fn add(&mut self, catalog: &SourceCatalog, data_id: DataId) -> Result<(), ValidateError> {
        if !catalog.schema.is_compatible_with(&self.schema) {
            return Err(ValidateError::SchemaMismatch(format!(
                "catalog {data_id} has fields [{}]",
                catalog.schema.fields().join(", ")
            )));
        }

        let detections: Vec<Detection> = catalog
            .iter()
            .map(|det| Detection { data_id, ..*det })
            .collect();
        let vectors: Vec<Vector3<f64>> = detections
            .iter()
            .map(|det| unit_vector(det.ra, det.dec))
            .collect();

        // Row indices sorted by declination for the sweep
        let mut by_dec: Vec<usize> = (0..detections.len()).collect();
        by_dec.sort_by(|&a, &b| detections[a].dec.total_cmp(&detections[b].dec));
        let sorted_dec: Vec<Radian> = by_dec.iter().map(|&i| detections[i].dec).collect();

        // claims[row] = (object index, separation) of every object that picked this row
        let mut claims: Vec<Vec<(usize, Radian)>> = vec![Vec::new(); detections.len()];

        for (obj_idx, obj) in self.objects.iter().enumerate() {
            let lo = sorted_dec.partition_point(|&d| d < obj.ref_dec - self.radius);
            let hi = sorted_dec.partition_point(|&d| d <= obj.ref_dec + self.radius);

            let mut best: Option<(usize, Radian)> = None;
            for &row in &by_dec[lo..hi] {
                let sep = separation_between(&obj.ref_vec, &vectors[row]);
                if sep <= self.radius && best.is_none_or(|(_, s)| sep < s) {
                    best = Some((row, sep));
                }
            }

            if let Some((row, sep)) = best {
                claims[row].push((obj_idx, sep));
            }
        }

        let mut n_new = 0usize;
        let mut n_ambiguous = 0usize;
        for (row, det) in detections.into_iter().enumerate() {
            let claimers = &claims[row];
            match claimers.as_slice() {
                [] => {
                    self.objects.push(MatchedObject {
                        ref_dec: det.dec,
                        ref_vec: vectors[row],
                        members: vec![det],
                        ambiguous: false,
                    });
                    n_new += 1;
                }
                [(obj_idx, _)] => self.objects[*obj_idx].members.push(det),
                many => {
                    // Claimers are pushed in object order, so a strict comparison keeps the
                    // lowest id on ties
                    let mut nearest = many[0];
                    for &claim in &many[1..] {
                        if claim.1 < nearest.1 {
                            nearest = claim;
                        }
                    }
                    self.objects[nearest.0].members.push(det);
                    for &(obj_idx, _) in many {
                        self.objects[obj_idx].ambiguous = true;
                    }
                    n_ambiguous += 1;
                }
            }
        }

        self.n_catalogs += 1;
        debug!(
            "matched catalog {data_id}: {n_new} new objects, {n_ambiguous} ambiguous detections, {} objects total",
            self.objects.len()
        );
        Ok(())
    }

    /// Finalize the match.
    ///
    /// Arguments
    /// ---------
    /// * `remove_ambiguous`: drop every object flagged ambiguous during matching
    ///
    /// Return
    /// ------
    /// * the [`MatchedCatalog`], object ids starting at 1
    pub fn finish(self, remove_ambiguous: bool) -> MatchedCatalog {
        let mut rows = Vec::with_capacity(self.objects.iter().map(|o| o.members.len()).sum());
        let mut n_dropped = 0usize;

        for (idx, obj) in self.objects.into_iter().enumerate() {
            if remove_ambiguous && obj.ambiguous {
                n_dropped += 1;
                continue;
            }
            let object_id = idx as ObjectId + 1;
            rows.extend(obj.members.into_iter().map(|detection| MatchedRow {
                object_id,
                detection,
            }));
        }

        debug!(
            "match finished over {} catalogs: {} rows, {n_dropped} ambiguous objects dropped",
            self.n_catalogs,
            rows.len()
        );

        MatchedCatalog {
            schema: self.schema,
            rows,
        }
    }
}
