pub mod analysis;
pub mod catalog;
pub mod checks;
pub mod constants;
pub mod conversion;
pub mod loader;
pub mod logging;
pub mod matching;
pub mod metric_task;
pub mod report;
pub mod repository;
pub mod srd;
pub mod validate;
pub mod validate_errors;

#[cfg(feature = "progress")]
pub mod progress_bar;

pub use validate::{run, RunConfig, ValidationOutcome};
pub use validate_errors::ValidateError;
