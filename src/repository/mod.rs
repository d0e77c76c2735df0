//! # Data repositories
//!
//! Read-only access to the three datasets the validation pipeline consumes for each
//! visit/CCD [`DataId`]:
//!
//! | dataset       | content                                       | method                                  |
//! |---------------|-----------------------------------------------|-----------------------------------------|
//! | `src_schema`  | column names shared by every source catalog   | [`DataRepository::schema`]              |
//! | `src`         | detection catalog of one visit/CCD            | [`DataRepository::source_catalog`]      |
//! | `calexp_md`   | calibrated exposure metadata (`FLUXMAG0`, …)  | [`DataRepository::calib_metadata`]      |
//!
//! Two implementations are provided:
//!
//! * [`FileRepository`] – a directory tree of CSV catalogs and JSON metadata files.
//! * [`MemoryRepository`] – in-memory datasets, for programmatic use and tests.
//!
//! A dataset that does not exist for the requested data id is reported as
//! [`ValidateError::DatasetNotFound`]; callers treat it as fatal.
use camino::Utf8Path;

use crate::catalog::calib::CalibMetadata;
use crate::catalog::{Schema, SourceCatalog};
use crate::constants::DataId;
use crate::validate_errors::ValidateError;

pub mod file_repo;
pub mod memory;

pub use file_repo::FileRepository;
pub use memory::MemoryRepository;

/// Dataset name of the source catalogs.
pub const SRC_DATASET: &str = "src";
/// Dataset name of the calibrated exposure metadata.
pub const CALEXP_MD_DATASET: &str = "calexp_md";
/// Dataset name of the shared catalog schema.
pub const SRC_SCHEMA_DATASET: &str = "src_schema";

/// Source of catalogs, schema and calibration metadata keyed by [`DataId`].
pub trait DataRepository {
    /// Schema shared by every source catalog of the repository.
    fn schema(&self) -> Result<Schema, ValidateError>;

    /// Uncalibrated detection catalog of one visit/CCD.
    fn source_catalog(&self, data_id: &DataId) -> Result<SourceCatalog, ValidateError>;

    /// Calibrated exposure metadata of one visit/CCD.
    fn calib_metadata(&self, data_id: &DataId) -> Result<CalibMetadata, ValidateError>;

    /// Location used to name output artifacts, when the repository has one.
    fn location(&self) -> Option<&Utf8Path> {
        None
    }
}

impl<T: DataRepository + ?Sized> DataRepository for &T {
    fn schema(&self) -> Result<Schema, ValidateError> {
        (**self).schema()
    }

    fn source_catalog(&self, data_id: &DataId) -> Result<SourceCatalog, ValidateError> {
        (**self).source_catalog(data_id)
    }

    fn calib_metadata(&self, data_id: &DataId) -> Result<CalibMetadata, ValidateError> {
        (**self).calib_metadata(data_id)
    }

    fn location(&self) -> Option<&Utf8Path> {
        (**self).location()
    }
}
