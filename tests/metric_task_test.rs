use std::fs::File;
use std::io::BufReader;

use serde_json::json;
use validate_drp::metric_task::{
    Config, ConfigPpdbLoader, DbInfo, DbLoader, Measurement, OutputDataId, Ppdb,
    PpdbConfig, PpdbMetricConfig, PpdbMetricTask,
};
use validate_drp::ValidateError;

fn read_config(path: &str) -> Config {
    serde_json::from_reader(BufReader::new(File::open(path).unwrap())).unwrap()
}

/// Measures the length of the instrument name, or 0 without an output data id.
struct InstrumentLengthTask {
    config: PpdbMetricConfig,
}

impl InstrumentLengthTask {
    fn new() -> Self {
        InstrumentLengthTask {
            config: PpdbMetricConfig::new("ppdb.instrumentLength"),
        }
    }
}

impl PpdbMetricTask for InstrumentLengthTask {
    fn config(&self) -> &PpdbMetricConfig {
        &self.config
    }

    fn make_measurement(
        &self,
        _db: &Ppdb,
        output_data_id: &OutputDataId,
    ) -> Result<Option<Measurement>, ValidateError> {
        let value = output_data_id
            .get("instrument")
            .and_then(|v| v.as_str())
            .map_or(0, str::len);
        Ok(Some(Measurement::new(
            self.config.metric_name.clone(),
            value as f64,
            "",
        )))
    }
}

#[derive(Debug)]
struct MockLoader;

impl DbLoader for MockLoader {
    fn run(&self, _db_info: &Config) -> Result<Option<Ppdb>, ValidateError> {
        Ok(Some(Ppdb::new(PpdbConfig::new("sqlite://"))))
    }
}

#[test]
fn test_loader_finds_nested_choice() {
    let config = read_config("tests/data/ap_pipe_config.json");
    let ppdb = ConfigPpdbLoader.get_ppdb(&config).unwrap().unwrap();
    assert_eq!(ppdb.db_url(), "sqlite:///association.db");
    assert_eq!(
        ppdb.config().isolation_level.as_deref(),
        Some("READ_UNCOMMITTED")
    );
    assert_eq!(ppdb.config().connection_timeout, 60.0);
}

#[test]
fn test_loader_without_database() {
    let config = read_config("tests/data/isr_config.json");
    assert_eq!(ConfigPpdbLoader.get_ppdb(&config), Ok(None));
}

#[test]
fn test_valid_run() {
    let task = InstrumentLengthTask::new();
    let config = read_config("tests/data/ap_pipe_config.json");
    let measurement = task.run(config.into()).unwrap().unwrap();
    assert_eq!(measurement.metric, "ppdb.instrumentLength");
    assert_eq!(measurement.value, 0.0);
}

#[test]
fn test_valid_run_with_data_id() {
    let task = InstrumentLengthTask::new();
    let config = read_config("tests/data/ap_pipe_config.json");
    let data_id = OutputDataId::from([("instrument".to_string(), json!("NotACam"))]);

    let measurement = task.adapt_args_and_run(config.into(), &data_id).unwrap().unwrap();
    assert_eq!(measurement.value, 7.0);
    assert_eq!(measurement.metadata["data_id.instrument"], json!("NotACam"));
    assert_eq!(
        measurement.metadata["estimator"],
        json!("ppdb.instrumentLength")
    );
}

#[test]
fn test_no_database_no_measurement() {
    let task = InstrumentLengthTask::new();
    let config = read_config("tests/data/isr_config.json");
    assert_eq!(task.run(config.into()), Ok(None));
}

#[test]
fn test_retargeted_loader() {
    let mut task = InstrumentLengthTask::new();
    task.config.retarget(MockLoader);

    let configs = vec![
        read_config("tests/data/isr_config.json"),
        read_config("tests/data/ap_pipe_config.json"),
    ];
    let measurement = task.run(DbInfo::List(configs)).unwrap();
    assert!(measurement.is_some());
}

#[test]
fn test_db_info_list_uses_first() {
    let task = InstrumentLengthTask::new();
    let configs = vec![
        read_config("tests/data/isr_config.json"),
        read_config("tests/data/ap_pipe_config.json"),
    ];
    assert_eq!(task.run(DbInfo::List(configs)), Ok(None));
}
