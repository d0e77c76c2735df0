//! Console logging for the command line tool.
//!
//! `RUST_LOG` takes precedence over the level given on the command line. Warnings and
//! errors go to stderr, everything else to stdout.
use tracing::Level;
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt, Tee, WithMaxLevel, WithMinLevel};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::validate_errors::ValidateError;

/// Route `INFO` and more verbose events to `out`, `WARN` and `ERROR` to `err`.
///
/// Levels order from `ERROR` (lowest) to `TRACE` (highest).
pub fn split_writer<O, E>(out: O, err: E) -> Tee<WithMinLevel<O>, WithMaxLevel<E>>
where
    O: for<'w> MakeWriter<'w>,
    E: for<'w> MakeWriter<'w>,
{
    out.with_min_level(Level::INFO)
        .and(err.with_max_level(Level::WARN))
}

/// Install the global subscriber.
///
/// Return
/// ------
/// * `Err(InvalidConfig)` if `base_level` is not a valid filter directive or a subscriber
///   is already installed
pub fn setup_logging(base_level: &str) -> Result<(), ValidateError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .map_err(|e| ValidateError::InvalidConfig(format!("invalid log filter: {e}")))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(true)
        .with_writer(split_writer(std::io::stdout, std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| ValidateError::InvalidConfig(format!("logger initialization failed: {e}")))
}

#[cfg(test)]
mod logging_test {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_split_writer_routing() {
        let (out, err) = (SharedBuf::default(), SharedBuf::default());
        let (out_w, err_w) = (out.clone(), err.clone());

        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(split_writer(move || out_w.clone(), move || err_w.clone()))
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("3 sources in ccd: 10");
            tracing::warn!("median scatter too large");
            tracing::error!("dataset missing");
        });

        let (out, err) = (out.contents(), err.contents());
        assert!(out.contains("3 sources in ccd: 10"));
        assert!(!out.contains("median scatter too large"));
        assert!(!out.contains("dataset missing"));

        assert!(err.contains("median scatter too large"));
        assert!(err.contains("dataset missing"));
        assert!(!err.contains("3 sources"));
        assert_eq!(out.matches("3 sources").count(), 1);
    }
}
