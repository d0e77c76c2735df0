//! Task configuration trees.
//!
//! A science task configuration is a tree of named fields. Each field is one of a small,
//! closed set of kinds, modelled as [`FieldValue`]:
//!
//! | kind           | content                                                     |
//! |----------------|-------------------------------------------------------------|
//! | `scalar`       | a plain value (number, string, list, …)                      |
//! | `config`       | a nested configuration                                      |
//! | `configurable` | the configuration of a retargetable subtask                 |
//! | `dict`         | configurations keyed by name                                |
//! | `choice`       | named alternatives with one (or several) active selections  |
//!
//! A [`Config`] node is either a database configuration ([`PpdbConfig`]) or a task
//! configuration ([`TaskConfig`]). Trees deserialize from JSON:
//!
//! ```json
//! {
//!   "type": "task",
//!   "name": "processCcd",
//!   "fields": [
//!     { "name": "doWrite", "value": { "kind": "scalar", "value": true } },
//!     { "name": "ppdb", "value": { "kind": "configurable",
//!         "value": { "target": "Ppdb", "config": { "type": "db", "db_url": "sqlite:///ppdb.db" } } } }
//!   ]
//! }
//! ```
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::validate_errors::ValidateError;

fn default_timeout() -> f64 {
    60.0
}

/// Connection settings of a prompt products database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpdbConfig {
    pub db_url: String,
    #[serde(default)]
    pub isolation_level: Option<String>,
    /// Seconds
    #[serde(default = "default_timeout")]
    pub connection_timeout: f64,
}

impl PpdbConfig {
    pub fn new(db_url: impl Into<String>) -> Self {
        PpdbConfig {
            db_url: db_url.into(),
            isolation_level: None,
            connection_timeout: default_timeout(),
        }
    }
}

/// Handle on a prompt products database, built from its configuration.
///
/// No connection is opened: the handle carries the settings a client would use.
#[derive(Debug, Clone, PartialEq)]
pub struct Ppdb {
    config: PpdbConfig,
}

impl Ppdb {
    pub fn new(config: PpdbConfig) -> Self {
        Ppdb { config }
    }

    pub fn config(&self) -> &PpdbConfig {
        &self.config
    }

    pub fn db_url(&self) -> &str {
        &self.config.db_url
    }
}

/// A node of a configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Config {
    Db(PpdbConfig),
    Task(TaskConfig),
}

/// Ordered named fields of a task configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<ConfigField>,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>) -> Self {
        TaskConfig {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, keeping declaration order.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push(ConfigField {
            name: name.into(),
            value,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Scalar(serde_json::Value),
    Config(Config),
    Configurable { target: String, config: Config },
    Dict(BTreeMap<String, Config>),
    Choice {
        selection: Selection,
        choices: BTreeMap<String, Config>,
    },
}

/// Active names of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Single(String),
    Multi(Vec<String>),
}

impl FieldValue {
    /// Active configurations of a choice field, in selection order.
    ///
    /// Return
    /// ------
    /// * an empty list for any other kind of field
    /// * `Err(InvalidConfig)` if a selected name is not one of the choices
    pub fn active(&self) -> Result<Vec<&Config>, ValidateError> {
        let FieldValue::Choice { selection, choices } = self else {
            return Ok(Vec::new());
        };
        let lookup = |name: &String| {
            choices.get(name).ok_or_else(|| {
                ValidateError::InvalidConfig(format!(
                    "selection '{name}' is not one of [{}]",
                    choices.keys().cloned().collect::<Vec<_>>().join(", ")
                ))
            })
        };
        match selection {
            Selection::Single(name) => Ok(vec![lookup(name)?]),
            Selection::Multi(names) => names.iter().map(lookup).collect(),
        }
    }
}

#[cfg(test)]
mod config_test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_tree() {
        let config: Config = serde_json::from_value(json!({
            "type": "task",
            "name": "processCcd",
            "fields": [
                { "name": "doWrite", "value": { "kind": "scalar", "value": true } },
                { "name": "ppdb", "value": { "kind": "configurable", "value": {
                    "target": "Ppdb",
                    "config": { "type": "db", "db_url": "sqlite:///ppdb.db" }
                } } },
                { "name": "flavor", "value": { "kind": "choice", "value": {
                    "selection": ["a", "b"],
                    "choices": { "a": { "type": "task" }, "b": { "type": "task" } }
                } } }
            ]
        }))
        .unwrap();

        let Config::Task(task) = config else {
            panic!("expected a task config");
        };
        assert_eq!(task.name, "processCcd");
        assert_eq!(task.fields.len(), 3);
        assert_eq!(task.get("doWrite"), Some(&FieldValue::Scalar(json!(true))));
        assert_eq!(
            task.get("ppdb"),
            Some(&FieldValue::Configurable {
                target: "Ppdb".into(),
                config: Config::Db(PpdbConfig::new("sqlite:///ppdb.db")),
            })
        );
        assert_eq!(task.get("flavor").unwrap().active().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_choice() {
        let field = FieldValue::Choice {
            selection: Selection::Single("missing".into()),
            choices: BTreeMap::from([("a".to_string(), Config::Task(TaskConfig::new("a")))]),
        };
        assert_eq!(
            field.active(),
            Err(ValidateError::InvalidConfig(
                "selection 'missing' is not one of [a]".into()
            ))
        );
        assert!(FieldValue::Scalar(json!(1)).active().unwrap().is_empty());
    }
}
