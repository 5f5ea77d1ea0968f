//! Structured logging: JSON lines on stdout plus warn+ events persisted to
//! SQLite, tagged with the session they happened in.

mod logging;

pub use logging::{LogQuery, LogRecord, SqliteLogLayer, SqliteLogSink};

use std::path::PathBuf;
use std::sync::Arc;

use mentora_settings::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info` or
    /// `info,mentora_engine=debug`).
    pub filter: String,
    pub log_to_sqlite: bool,
    pub log_db_path: PathBuf,
}

impl From<&LoggingSettings> for TelemetryConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            filter: settings.level.clone(),
            log_to_sqlite: settings.log_to_sqlite,
            log_db_path: settings.log_db_path.clone(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from(&LoggingSettings::default())
    }
}

/// Keeps the log sink alive for the lifetime of the process.
pub struct TelemetryGuard {
    log_sink: Option<Arc<SqliteLogSink>>,
}

impl TelemetryGuard {
    /// Persisted warn+ logs, when SQLite logging is enabled.
    pub fn logs(&self) -> Option<&SqliteLogSink> {
        self.log_sink.as_deref()
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_span_list(true)
        .with_filter(env_filter);

    let log_sink = if config.log_to_sqlite {
        match SqliteLogSink::open(&config.log_db_path) {
            Ok(sink) => Some(Arc::new(sink)),
            Err(e) => {
                eprintln!("mentora-telemetry: failed to open log DB {:?}: {e}", config.log_db_path);
                None
            }
        }
    } else {
        None
    };
    let sqlite_layer = log_sink.clone().map(SqliteLogLayer::new);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(sqlite_layer)
        .init();

    TelemetryGuard { log_sink }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_follows_logging_settings() {
        let settings = LoggingSettings {
            level: "debug,hyper=warn".into(),
            log_to_sqlite: false,
            log_db_path: PathBuf::from("/tmp/x.db"),
        };
        let config = TelemetryConfig::from(&settings);
        assert_eq!(config.filter, "debug,hyper=warn");
        assert!(!config.log_to_sqlite);
        assert_eq!(config.log_db_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn default_config_logs_at_info() {
        let config = TelemetryConfig::default();
        assert_eq!(config.filter, "info");
        assert!(config.log_to_sqlite);
    }
}
