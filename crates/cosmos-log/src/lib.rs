//! Structured logging for Cosmos Journeyer.
//!
//! Console output with uptime timestamps and module paths, plus a JSON log
//! file in debug builds. `RUST_LOG` wins over the configured level.

use std::path::Path;

use cosmos_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config sets a level.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "cosmos-journeyer.log";

/// Filter string for a config: its `debug.log_level`, or [`DEFAULT_FILTER`].
#[must_use]
pub fn filter_directives(config: Option<&Config>) -> String {
    config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - Directory for the JSON log file (debug builds only)
/// * `debug_build` - Whether to also write the JSON log file
/// * `config` - Configuration providing the default log level
///
/// ```no_run
/// use cosmos_log::init_logging;
///
/// init_logging(Some(std::path::Path::new("./logs")), true, None);
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter = filter_directives(config);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter));

    // Worker threads are named `chunk-forge-N`, so keep thread names visible.
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_filter_defaults_to_info() {
        assert_eq!(filter_directives(None), "info");
        let mut config = Config::default();
        config.debug.log_level = "  ".to_string();
        assert_eq!(filter_directives(Some(&config)), "info");
    }

    #[test]
    fn test_filter_uses_config_level() {
        let mut config = Config::default();
        config.debug.log_level = "warn,cosmos_forge=debug".to_string();
        let directives = filter_directives(Some(&config));
        assert_eq!(directives, "warn,cosmos_forge=debug");
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_json_layer_writes_structured_fields() {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("info"))
            .with(fmt::layer().with_writer(buffer.clone()).with_ansi(false).json());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(planet = 3, "planet created");
            tracing::debug!("filtered out");
        });

        let bytes = buffer.0.lock().unwrap().clone();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["fields"]["message"], "planet created");
        assert_eq!(event["fields"]["planet"], 3);
    }

    #[test]
    fn test_log_file_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(LOG_FILE_NAME);
        assert_eq!(path.file_name().unwrap(), "cosmos-journeyer.log");
    }
}
