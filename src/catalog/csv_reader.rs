//! # CSV reader for source catalogs
//!
//! Ingestion of one visit/CCD **source catalog** from CSV into a typed [`SourceCatalog`].
//!
//! ## Expected layout
//! -----------------
//! The first line is a header naming the columns. All [`REQUIRED_COLUMNS`](super::REQUIRED_COLUMNS) must be present,
//! in any order; other columns are ignored. Column indices are resolved **once** from the
//! header, then every row is parsed by index.
//!
//! - `id`: unsigned integer source id.
//! - `coord_ra`, `coord_dec`: position in **degrees**, converted to radians.
//! - `base_PsfFlux_flux`, `base_PsfFlux_fluxSigma`, `base_ClassificationExtendedness_value`:
//!   floating point; an empty cell reads as `NaN` (failed measurement).
//! - `base_PixelFlags_flag_*`: booleans (`true`/`false`, `True`/`False`, `1`/`0`).
//!
//! ## Error handling
//! -----------------
//! - A missing required column surfaces as [`ValidateError::MissingField`].
//! - A cell that cannot be parsed surfaces as [`ValidateError::InvalidValue`].
//! - Malformed CSV (ragged rows, I/O) surfaces as [`ValidateError::CsvError`].
use std::io;

use csv::{ReaderBuilder, StringRecord};

use super::{
    Detection, PixelFlags, Schema, SourceCatalog, COORD_DEC, COORD_RA, EXTENDEDNESS, FLAG_BAD,
    FLAG_CR, FLAG_EDGE, FLAG_SATURATED, PSF_FLUX, PSF_FLUX_SIGMA, SOURCE_ID,
};
use crate::constants::{DataId, Degree};
use crate::validate_errors::ValidateError;

/// Column positions of the required fields, resolved from a header.
struct ColumnIndex {
    id: usize,
    ra: usize,
    dec: usize,
    flux: usize,
    flux_sigma: usize,
    saturated: usize,
    cr: usize,
    bad: usize,
    edge: usize,
    extendedness: usize,
}

impl ColumnIndex {
    fn resolve(schema: &Schema) -> Result<Self, ValidateError> {
        Ok(ColumnIndex {
            id: schema.find(SOURCE_ID)?,
            ra: schema.find(COORD_RA)?,
            dec: schema.find(COORD_DEC)?,
            flux: schema.find(PSF_FLUX)?,
            flux_sigma: schema.find(PSF_FLUX_SIGMA)?,
            saturated: schema.find(FLAG_SATURATED)?,
            cr: schema.find(FLAG_CR)?,
            bad: schema.find(FLAG_BAD)?,
            edge: schema.find(FLAG_EDGE)?,
            extendedness: schema.find(EXTENDEDNESS)?,
        })
    }
}

fn schema_from_header(header: &StringRecord) -> Schema {
    Schema::new(header.iter().map(str::trim))
}

fn cell<'r>(record: &'r StringRecord, idx: usize, column: &str) -> Result<&'r str, ValidateError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| ValidateError::MissingField(column.to_string()))
}

fn parse_f64(record: &StringRecord, idx: usize, column: &str) -> Result<f64, ValidateError> {
    let raw = cell(record, idx, column)?;
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|_| ValidateError::InvalidValue {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn parse_bool(record: &StringRecord, idx: usize, column: &str) -> Result<bool, ValidateError> {
    let raw = cell(record, idx, column)?;
    match raw {
        "1" | "true" | "True" | "TRUE" => Ok(true),
        "0" | "false" | "False" | "FALSE" => Ok(false),
        _ => Err(ValidateError::InvalidValue {
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_id(record: &StringRecord, idx: usize) -> Result<u64, ValidateError> {
    let raw = cell(record, idx, SOURCE_ID)?;
    raw.parse::<u64>().map_err(|_| ValidateError::InvalidValue {
        column: SOURCE_ID.to_string(),
        value: raw.to_string(),
    })
}

fn parse_detection(
    record: &StringRecord,
    cols: &ColumnIndex,
    data_id: DataId,
) -> Result<Detection, ValidateError> {
    let flags = PixelFlags {
        saturated: parse_bool(record, cols.saturated, FLAG_SATURATED)?,
        cr: parse_bool(record, cols.cr, FLAG_CR)?,
        bad: parse_bool(record, cols.bad, FLAG_BAD)?,
        edge: parse_bool(record, cols.edge, FLAG_EDGE)?,
    };

    let ra: Degree = parse_f64(record, cols.ra, COORD_RA)?;
    let dec: Degree = parse_f64(record, cols.dec, COORD_DEC)?;

    Ok(Detection::new(
        parse_id(record, cols.id)?,
        ra.to_radians(),
        dec.to_radians(),
        parse_f64(record, cols.flux, PSF_FLUX)?,
        parse_f64(record, cols.flux_sigma, PSF_FLUX_SIGMA)?,
        data_id,
    )
    .with_flags(flags)
    .with_extendedness(parse_f64(record, cols.extendedness, EXTENDEDNESS)?))
}

/// Read the schema (header line only) of a CSV catalog.
///
/// Return
/// ------
/// * the header as a [`Schema`], after checking that every required column is present
pub fn read_schema<R: io::Read>(reader: R) -> Result<Schema, ValidateError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let schema = schema_from_header(rdr.headers()?);
    schema.validate_required()?;
    Ok(schema)
}

/// Read a full source catalog from CSV.
///
/// Arguments
/// ---------
/// * `reader`: any byte source holding the CSV text
/// * `data_id`: the visit/CCD this catalog belongs to, stamped on every detection
///
/// Return
/// ------
/// * a [`SourceCatalog`] with uncalibrated detections (magnitudes are `NaN`)
pub fn read_source_catalog<R: io::Read>(
    reader: R,
    data_id: DataId,
) -> Result<SourceCatalog, ValidateError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let schema = schema_from_header(rdr.headers()?);
    let cols = ColumnIndex::resolve(&schema)?;

    let detections = rdr
        .records()
        .map(|record| parse_detection(&record?, &cols, data_id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SourceCatalog::new(schema, data_id, detections))
}
