//! Structured logging for the riftlink client.
//!
//! Console output with an uptime timer, plus a JSON log file in debug builds
//! for post-mortem analysis. `RUST_LOG` wins over the configured level. `log`
//! records from dependencies (the config loader uses `log`) are forwarded into
//! `tracing`.

use riftlink_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing_subscriber::util::TryInitError;

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "riftlink.log";

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info,riftlink_net=debug";

/// Install the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - whether to write the JSON log file
/// * `config` - source of the `debug.log_level` filter
///
/// Fails if a global subscriber is already installed.
///
/// ```no_run
/// use riftlink_config::Config;
/// use riftlink_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config)).unwrap();
/// ```
pub fn init_logging(
    log_dir: Option<&Path>,
    debug_build: bool,
    config: Option<&Config>,
) -> Result<(), TryInitError> {
    let filter_str = configured_filter(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

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

        subscriber.with(file_layer).try_init()?;
        tracing::debug!(dir = %log_dir.display(), "file logging enabled");
        return Ok(());
    }

    subscriber.try_init()
}

/// The filter directive string taken from `config`, or [`DEFAULT_FILTER`].
pub fn configured_filter(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.clone()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// An `EnvFilter` built from [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_default_log_level() {
        let filter_str = default_env_filter().to_string();
        assert!(filter_str.contains("riftlink_net=debug"));
        assert!(filter_str.contains("info"));
    }

    #[test]
    fn test_default_config_keeps_net_debug_level() {
        assert_eq!(configured_filter(Some(&Config::default())), DEFAULT_FILTER);
    }

    #[test]
    fn test_configured_filter_prefers_config() {
        let mut config = Config::default();
        config.debug.log_level = "warn,riftlink_net=trace".to_string();
        assert_eq!(configured_filter(Some(&config)), "warn,riftlink_net=trace");
    }

    #[test]
    fn test_configured_filter_falls_back() {
        let mut config = Config::default();
        config.debug.log_level = "  ".to_string();
        assert_eq!(configured_filter(Some(&config)), DEFAULT_FILTER);
        assert_eq!(configured_filter(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        let valid_filters = [
            "info",
            "debug,riftlink_net=trace",
            "warn,riftlink_net::tcp_client=debug,riftlink_client=info",
            "error",
        ];

        for filter_str in &valid_filters {
            let result = EnvFilter::try_from(*filter_str);
            assert!(result.is_ok(), "Failed to parse filter: {}", filter_str);
        }
    }

    /// Writer that appends into a shared buffer.
    #[derive(Clone, Default)]
    struct Buffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

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
    fn test_json_layer_emits_structured_fields() {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(buffer.clone())
                .with_ansi(false)
                .with_timer(fmt::time::uptime())
                .json(),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(kind = "Login", len = 4, "sent");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let line = output.lines().next().expect("one log line");
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["fields"]["message"], "sent");
        assert_eq!(value["fields"]["kind"], "Login");
        assert_eq!(value["fields"]["len"], 4);
    }

    #[test]
    fn test_log_file_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_file_path = temp_dir.path().join(LOG_FILE_NAME);
        std::fs::File::create(&log_file_path).unwrap();
        assert!(log_file_path.exists());
        assert_eq!(log_file_path.file_name().unwrap(), "riftlink.log");
    }
}
