//! # Metrics computed from a prompt products database
//!
//! A [`PpdbMetricTask`] measures a quantity from a database whose location is only known
//! through the configuration of the task that wrote it. The task
//!
//! 1. receives that configuration as [`DbInfo`] (a single tree, or a list whose first
//!    element is used),
//! 2. hands it to its [`DbLoader`] subtask, by default a [`ConfigPpdbLoader`] searching the
//!    tree for the database settings,
//! 3. calls [`PpdbMetricTask::make_measurement`] when a database was found,
//! 4. stamps standard metadata on the resulting [`Measurement`].
//!
//! Implementors only provide the measurement hook and access to their
//! [`PpdbMetricConfig`]. The loader can be retargeted, e.g. to a mock in tests.
//!
//! See also
//! ------------
//! * [`config`] – the configuration tree model.
//! * [`loader`] – the configuration walker.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod config;
pub mod loader;

pub use config::{Config, ConfigField, FieldValue, Ppdb, PpdbConfig, Selection, TaskConfig};
pub use loader::{ConfigPpdbLoader, DbLoader};

use crate::validate_errors::ValidateError;

/// Identifier of the dataset a measurement is written for, e.g. `{"instrument": "HSC"}`.
pub type OutputDataId = BTreeMap<String, serde_json::Value>;

/// Configuration trees handed to a metric task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DbInfo {
    Single(Config),
    List(Vec<Config>),
}

impl DbInfo {
    /// The configuration actually searched: the single tree, or the first list element.
    pub fn first(&self) -> Result<&Config, ValidateError> {
        match self {
            DbInfo::Single(config) => Ok(config),
            DbInfo::List(configs) => configs.first().ok_or_else(|| {
                ValidateError::MetricComputation("empty list of database configurations".into())
            }),
        }
    }
}

impl From<Config> for DbInfo {
    fn from(config: Config) -> Self {
        DbInfo::Single(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub metric: String,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Measurement {
    pub fn new(metric: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Measurement {
            metric: metric.into(),
            value,
            unit: unit.into(),
            metadata: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.value)?;
        if !self.unit.is_empty() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}

/// Settings shared by every database metric task.
#[derive(Debug)]
pub struct PpdbMetricConfig {
    pub metric_name: String,
    db_loader: Box<dyn DbLoader>,
}

impl PpdbMetricConfig {
    pub fn new(metric_name: impl Into<String>) -> Self {
        PpdbMetricConfig {
            metric_name: metric_name.into(),
            db_loader: Box::new(ConfigPpdbLoader),
        }
    }

    /// Replace the subtask used to obtain the database.
    pub fn retarget(&mut self, loader: impl DbLoader + 'static) {
        self.db_loader = Box::new(loader);
    }

    pub fn db_loader(&self) -> &dyn DbLoader {
        self.db_loader.as_ref()
    }
}

pub trait PpdbMetricTask {
    fn config(&self) -> &PpdbMetricConfig;

    /// Compute the metric from `db`.
    ///
    /// `Ok(None)` means the metric is not defined for this database.
    fn make_measurement(
        &self,
        db: &Ppdb,
        output_data_id: &OutputDataId,
    ) -> Result<Option<Measurement>, ValidateError>;

    fn run(&self, db_info: DbInfo) -> Result<Option<Measurement>, ValidateError> {
        self.adapt_args_and_run(db_info, &OutputDataId::new())
    }

    /// Load the database described by `db_info` and measure it.
    ///
    /// Return
    /// ------
    /// * `Ok(None)` if no database could be located or the hook produced nothing
    /// * `Err(MetricComputation)` for an empty list of configurations
    fn adapt_args_and_run(
        &self,
        db_info: DbInfo,
        output_data_id: &OutputDataId,
    ) -> Result<Option<Measurement>, ValidateError> {
        let config = db_info.first()?;
        let Some(db) = self.config().db_loader().run(config)? else {
            debug!("no database configured, {} not measured", self.config().metric_name);
            return Ok(None);
        };

        let mut measurement = self.make_measurement(&db, output_data_id)?;
        if let Some(m) = measurement.as_mut() {
            self.add_standard_metadata(m, output_data_id);
        }
        Ok(measurement)
    }

    /// Record where a measurement comes from: the estimating metric and the output data id.
    fn add_standard_metadata(&self, measurement: &mut Measurement, output_data_id: &OutputDataId) {
        measurement.metadata.insert(
            "estimator".into(),
            serde_json::Value::from(self.config().metric_name.as_str()),
        );
        for (key, value) in output_data_id {
            measurement
                .metadata
                .insert(format!("data_id.{key}"), value.clone());
        }
    }
}
