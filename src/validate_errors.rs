use thiserror::Error;

use crate::constants::DataId;

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Dataset '{dataset}' not found for {data_id}")]
    DatasetNotFound { dataset: String, data_id: DataId },

    #[error("Schema dataset not found in repository: {0}")]
    SchemaNotFound(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV reading error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Field '{0}' not found in schema")]
    MissingField(String),

    #[error("Catalog schema does not match the matcher schema: {0}")]
    SchemaMismatch(String),

    #[error("Calibration key '{key}' missing for {data_id}")]
    MissingCalibKey { key: String, data_id: DataId },

    #[error("Invalid value '{value}' in column '{column}'")]
    InvalidValue { column: String, value: String },

    #[error("Invalid data id: {0}")]
    InvalidDataId(String),

    #[error("Could not determine which key is the ccd in data id: {0}")]
    UnknownCcdKey(String),

    #[error("No data ids were given")]
    NoDataIds,

    #[error("Negative flux {0} cannot be converted to a magnitude")]
    NegativeFlux(f64),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Plot rendering failed: {0}")]
    PlotError(String),

    #[error("Metric computation failed: {0}")]
    MetricComputation(String),
}

impl PartialEq for ValidateError {
    fn eq(&self, other: &Self) -> bool {
        use ValidateError::*;
        match (self, other) {
            (
                DatasetNotFound {
                    dataset: a,
                    data_id: ia,
                },
                DatasetNotFound {
                    dataset: b,
                    data_id: ib,
                },
            ) => a == b && ia == ib,
            (SchemaNotFound(a), SchemaNotFound(b)) => a == b,

            // Wrapped library errors only compare by variant
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,

            (MissingField(a), MissingField(b)) => a == b,
            (SchemaMismatch(a), SchemaMismatch(b)) => a == b,
            (
                MissingCalibKey {
                    key: a,
                    data_id: ia,
                },
                MissingCalibKey {
                    key: b,
                    data_id: ib,
                },
            ) => a == b && ia == ib,
            (
                InvalidValue {
                    column: ca,
                    value: va,
                },
                InvalidValue {
                    column: cb,
                    value: vb,
                },
            ) => ca == cb && va == vb,
            (InvalidDataId(a), InvalidDataId(b)) => a == b,
            (UnknownCcdKey(a), UnknownCcdKey(b)) => a == b,
            (NegativeFlux(a), NegativeFlux(b)) => a == b,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (PlotError(a), PlotError(b)) => a == b,
            (MetricComputation(a), MetricComputation(b)) => a == b,

            (NoDataIds, NoDataIds) => true,

            _ => false,
        }
    }
}
