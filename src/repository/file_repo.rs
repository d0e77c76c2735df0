//! File-based repository.
//!
//! Directory layout, rooted at the repository location:
//!
//! ```text
//! <root>/src_schema.csv                        header line of every catalog
//! <root>/src/v<visit>-<ccdkey><ccd>.csv        one detection catalog per visit/CCD
//! <root>/calexp_md/v<visit>-<ccdkey><ccd>.json calibration metadata, a flat JSON object
//! ```
use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::{DataRepository, CALEXP_MD_DATASET, SRC_DATASET, SRC_SCHEMA_DATASET};
use crate::catalog::calib::CalibMetadata;
use crate::catalog::csv_reader::{read_schema, read_source_catalog};
use crate::catalog::{Schema, SourceCatalog};
use crate::constants::DataId;
use crate::validate_errors::ValidateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRepository {
    root: Utf8PathBuf,
}

impl FileRepository {
    /// Open a repository rooted at `root`.
    ///
    /// Return
    /// ------
    /// * `Err(IoError)` if `root` is not an existing directory
    pub fn open(root: impl AsRef<Utf8Path>) -> Result<Self, ValidateError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ValidateError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("repository directory not found: {root}"),
            )));
        }
        Ok(FileRepository {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn schema_path(&self) -> Utf8PathBuf {
        self.root.join(format!("{SRC_SCHEMA_DATASET}.csv"))
    }

    pub fn catalog_path(&self, data_id: &DataId) -> Utf8PathBuf {
        self.root
            .join(SRC_DATASET)
            .join(format!("{}.csv", data_id.file_stem()))
    }

    pub fn calib_path(&self, data_id: &DataId) -> Utf8PathBuf {
        self.root
            .join(CALEXP_MD_DATASET)
            .join(format!("{}.json", data_id.file_stem()))
    }

    fn open_dataset(
        path: &Utf8Path,
        dataset: &str,
        data_id: &DataId,
    ) -> Result<BufReader<File>, ValidateError> {
        debug!("reading {dataset} for {data_id} from {path}");
        match File::open(path) {
            Ok(file) => Ok(BufReader::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ValidateError::DatasetNotFound {
                    dataset: dataset.to_string(),
                    data_id: *data_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl DataRepository for FileRepository {
    fn schema(&self) -> Result<Schema, ValidateError> {
        let path = self.schema_path();
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ValidateError::SchemaNotFound(path.to_string()),
            _ => e.into(),
        })?;
        read_schema(BufReader::new(file))
    }

    fn source_catalog(&self, data_id: &DataId) -> Result<SourceCatalog, ValidateError> {
        let reader = Self::open_dataset(&self.catalog_path(data_id), SRC_DATASET, data_id)?;
        read_source_catalog(reader, *data_id)
    }

    fn calib_metadata(&self, data_id: &DataId) -> Result<CalibMetadata, ValidateError> {
        let reader = Self::open_dataset(&self.calib_path(data_id), CALEXP_MD_DATASET, data_id)?;
        Ok(serde_json::from_reader(reader)?)
    }

    fn location(&self) -> Option<&Utf8Path> {
        Some(&self.root)
    }
}

#[cfg(test)]
mod file_repo_test {
    use super::*;
    use crate::constants::CcdKey;

    #[test]
    fn test_dataset_paths() {
        let repo = FileRepository {
            root: Utf8PathBuf::from("/data/repo"),
        };
        let id = DataId::new(849375, 12);
        assert_eq!(repo.schema_path(), "/data/repo/src_schema.csv");
        assert_eq!(repo.catalog_path(&id), "/data/repo/src/v849375-ccd12.csv");
        assert_eq!(
            repo.calib_path(&id.with_ccd_key(CcdKey::CcdNum)),
            "/data/repo/calexp_md/v849375-ccdnum12.json"
        );
    }

    #[test]
    fn test_open_missing_root() {
        assert!(matches!(
            FileRepository::open("/definitely/not/a/repo"),
            Err(ValidateError::IoError(_))
        ));
    }
}
