//! Locating a database configuration inside a task configuration tree.
//!
//! [`ConfigPpdbLoader`] walks a [`Config`] depth first, in field declaration order, and
//! builds a [`Ppdb`] from the first database configuration it meets:
//!
//! * a database node is used directly,
//! * a retargetable subtask is followed into its configuration,
//! * a choice field is followed into its active selection(s),
//! * dictionary entries are visited in key order,
//! * scalar fields are skipped.
//!
//! A tree with no database configuration yields `None`.
use std::fmt::Debug;

use tracing::debug;

use super::config::{Config, FieldValue, Ppdb, TaskConfig};
use crate::validate_errors::ValidateError;

/// Subtask turning a configuration into a database handle.
///
/// Implementors are swapped in through
/// [`PpdbMetricConfig::retarget`](super::PpdbMetricConfig::retarget).
pub trait DbLoader: Debug {
    fn run(&self, db_info: &Config) -> Result<Option<Ppdb>, ValidateError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigPpdbLoader;

impl ConfigPpdbLoader {
    pub fn new() -> Self {
        ConfigPpdbLoader
    }

    /// Build the first database handle found in `config`.
    ///
    /// Return
    /// ------
    /// * `Ok(None)` if no database configuration is present
    /// * `Err(InvalidConfig)` if a choice field selects an unknown name
    pub fn get_ppdb(&self, config: &Config) -> Result<Option<Ppdb>, ValidateError> {
        match config {
            Config::Db(db) => Ok(Some(Ppdb::new(db.clone()))),
            Config::Task(task) => self.search_task(task),
        }
    }

    fn search_task(&self, task: &TaskConfig) -> Result<Option<Ppdb>, ValidateError> {
        for field in &task.fields {
            if let Some(ppdb) = self.search_field(&field.value)? {
                debug!("database configuration found in {}.{}", task.name, field.name);
                return Ok(Some(ppdb));
            }
        }
        Ok(None)
    }

    fn search_field(&self, value: &FieldValue) -> Result<Option<Ppdb>, ValidateError> {
        match value {
            FieldValue::Scalar(_) => Ok(None),
            FieldValue::Config(config) | FieldValue::Configurable { config, .. } => {
                self.get_ppdb(config)
            }
            FieldValue::Dict(entries) => self.first_of(entries.values()),
            FieldValue::Choice { .. } => self.first_of(value.active()?),
        }
    }

    fn first_of<'a>(
        &self,
        configs: impl IntoIterator<Item = &'a Config>,
    ) -> Result<Option<Ppdb>, ValidateError> {
        for config in configs {
            if let Some(ppdb) = self.get_ppdb(config)? {
                return Ok(Some(ppdb));
            }
        }
        Ok(None)
    }
}

impl DbLoader for ConfigPpdbLoader {
    fn run(&self, db_info: &Config) -> Result<Option<Ppdb>, ValidateError> {
        self.get_ppdb(db_info)
    }
}

#[cfg(test)]
mod loader_test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::metric_task::config::{PpdbConfig, Selection};
    use serde_json::json;

    fn db(url: &str) -> Config {
        Config::Db(PpdbConfig::new(url))
    }

    fn task(name: &str) -> TaskConfig {
        TaskConfig::new(name).with_field("threshold", FieldValue::Scalar(json!(5.0)))
    }

    #[test]
    fn test_direct_db_config() {
        let ppdb = ConfigPpdbLoader.get_ppdb(&db("sqlite://")).unwrap().unwrap();
        assert_eq!(ppdb.db_url(), "sqlite://");
    }

    #[test]
    fn test_no_db_config() {
        let config = Config::Task(task("isr"));
        assert_eq!(ConfigPpdbLoader.get_ppdb(&config), Ok(None));
    }

    #[test]
    fn test_nested_configurable() {
        let inner = task("diaPipe").with_field(
            "ppdb",
            FieldValue::Configurable {
                target: "Ppdb".into(),
                config: db("postgresql://host/ppdb"),
            },
        );
        let outer = task("ap").with_field("diaPipe", FieldValue::Config(Config::Task(inner)));
        let ppdb = ConfigPpdbLoader.run(&Config::Task(outer)).unwrap().unwrap();
        assert_eq!(ppdb.db_url(), "postgresql://host/ppdb");
    }

    #[test]
    fn test_first_in_field_order() {
        let config = task("ap")
            .with_field("first", FieldValue::Config(db("sqlite:///first.db")))
            .with_field("second", FieldValue::Config(db("sqlite:///second.db")));
        let ppdb = ConfigPpdbLoader.get_ppdb(&Config::Task(config)).unwrap().unwrap();
        assert_eq!(ppdb.db_url(), "sqlite:///first.db");
    }

    #[test]
    fn test_choice_follows_active_selection() {
        let choices = BTreeMap::from([
            ("local".to_string(), db("sqlite:///local.db")),
            ("remote".to_string(), db("postgresql://remote")),
            ("none".to_string(), Config::Task(task("none"))),
        ]);
        let single = task("ap").with_field(
            "registry",
            FieldValue::Choice {
                selection: Selection::Single("remote".into()),
                choices: choices.clone(),
            },
        );
        let ppdb = ConfigPpdbLoader.get_ppdb(&Config::Task(single)).unwrap().unwrap();
        assert_eq!(ppdb.db_url(), "postgresql://remote");

        let multi = task("ap").with_field(
            "registry",
            FieldValue::Choice {
                selection: Selection::Multi(vec!["none".into(), "local".into()]),
                choices,
            },
        );
        let ppdb = ConfigPpdbLoader.get_ppdb(&Config::Task(multi)).unwrap().unwrap();
        assert_eq!(ppdb.db_url(), "sqlite:///local.db");
    }

    #[test]
    fn test_dict_entries() {
        let config = task("ap").with_field(
            "subtasks",
            FieldValue::Dict(BTreeMap::from([
                ("a".to_string(), Config::Task(task("a"))),
                ("b".to_string(), db("sqlite:///b.db")),
            ])),
        );
        let ppdb = ConfigPpdbLoader.get_ppdb(&Config::Task(config)).unwrap().unwrap();
        assert_eq!(ppdb.db_url(), "sqlite:///b.db");
    }

    #[test]
    fn test_unknown_selection_is_error() {
        let config = task("ap").with_field(
            "registry",
            FieldValue::Choice {
                selection: Selection::Single("cloud".into()),
                choices: BTreeMap::new(),
            },
        );
        assert!(matches!(
            ConfigPpdbLoader.get_ppdb(&Config::Task(config)),
            Err(ValidateError::InvalidConfig(_))
        ));
    }
}
