//! In-memory repository.
//!
//! Catalogs and metadata are stored as given; lookups clone them out. Useful to feed the
//! pipeline with synthetic data or catalogs produced by another tool.
use ahash::RandomState;
use std::collections::HashMap;

use super::{DataRepository, CALEXP_MD_DATASET, SRC_DATASET};
use crate::catalog::calib::{CalibMetadata, FLUXMAG0, FLUXMAG0ERR};
use crate::catalog::{Schema, SourceCatalog};
use crate::constants::DataId;
use crate::validate_errors::ValidateError;

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    schema: Schema,
    catalogs: HashMap<DataId, SourceCatalog, RandomState>,
    metadata: HashMap<DataId, CalibMetadata, RandomState>,
}

impl MemoryRepository {
    /// Empty repository whose catalogs follow `schema`.
    pub fn new(schema: Schema) -> Self {
        MemoryRepository {
            schema,
            catalogs: HashMap::default(),
            metadata: HashMap::default(),
        }
    }

    /// Store (or replace) the catalog of `catalog.data_id`.
    pub fn insert_catalog(&mut self, catalog: SourceCatalog) {
        self.catalogs.insert(catalog.data_id, catalog);
    }

    /// Store (or replace) the calibration metadata of `data_id`.
    pub fn insert_metadata(&mut self, data_id: DataId, metadata: CalibMetadata) {
        self.metadata.insert(data_id, metadata);
    }

    /// Store a catalog together with a metadata record holding only the zero point.
    pub fn insert_calibrated(&mut self, catalog: SourceCatalog, flux_mag0: f64, flux_mag0_err: f64) {
        let mut md = CalibMetadata::new();
        md.insert(FLUXMAG0.into(), serde_json::Value::from(flux_mag0));
        md.insert(FLUXMAG0ERR.into(), serde_json::Value::from(flux_mag0_err));
        self.insert_metadata(catalog.data_id, md);
        self.insert_catalog(catalog);
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

impl DataRepository for MemoryRepository {
    fn schema(&self) -> Result<Schema, ValidateError> {
        Ok(self.schema.clone())
    }

    fn source_catalog(&self, data_id: &DataId) -> Result<SourceCatalog, ValidateError> {
        self.catalogs
            .get(data_id)
            .cloned()
            .ok_or_else(|| ValidateError::DatasetNotFound {
                dataset: SRC_DATASET.into(),
                data_id: *data_id,
            })
    }

    fn calib_metadata(&self, data_id: &DataId) -> Result<CalibMetadata, ValidateError> {
        self.metadata
            .get(data_id)
            .cloned()
            .ok_or_else(|| ValidateError::DatasetNotFound {
                dataset: CALEXP_MD_DATASET.into(),
                data_id: *data_id,
            })
    }
}

#[cfg(test)]
mod memory_test {
    use super::*;
    use crate::catalog::Detection;

    #[test]
    fn test_memory_repository_lookup() {
        let id = DataId::new(1, 2);
        let cat = SourceCatalog::new(
            Schema::minimal(),
            id,
            vec![Detection::new(1, 0.0, 0.0, 1.0, 0.1, id)],
        );

        let mut repo = MemoryRepository::new(Schema::minimal());
        assert!(repo.is_empty());
        repo.insert_calibrated(cat.clone(), 1.0e12, 1.0e9);

        assert_eq!(repo.len(), 1);
        assert_eq!(repo.source_catalog(&id).unwrap(), cat);
        assert_eq!(
            repo.calib_metadata(&id).unwrap()[FLUXMAG0],
            serde_json::json!(1.0e12)
        );

        let missing = DataId::new(9, 2);
        assert_eq!(
            repo.source_catalog(&missing),
            Err(ValidateError::DatasetNotFound {
                dataset: SRC_DATASET.into(),
                data_id: missing
            })
        );
        assert_eq!(
            repo.calib_metadata(&missing),
            Err(ValidateError::DatasetNotFound {
                dataset: CALEXP_MD_DATASET.into(),
                data_id: missing
            })
        );
    }
}
