//! Logging setup with optional file rotation
//!
//! Installs a `tracing` subscriber writing to stderr, to a daily-rolling
//! log file, or both.

use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "nodemcu-bridge.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level
    pub level: Level,

    /// Log to file
    pub file_path: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,

    /// Include thread IDs
    pub thread_ids: bool,

    /// Ignore `RUST_LOG` and filter on `level` alone
    pub force_level: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: None,
            stderr: true,
            thread_ids: false,
            force_level: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            config.level = level_from_filter(&rust_log).unwrap_or(config.level);
        }

        if let Ok(log_file) = std::env::var("NODEMCU_LOG_FILE") {
            config.file_path = Some(PathBuf::from(log_file));
        }

        if let Ok(log_stderr) = std::env::var("NODEMCU_LOG_STDERR") {
            config.stderr = log_stderr.to_lowercase() != "false";
        }

        config
    }

    /// Force a level regardless of `RUST_LOG`
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self.force_level = true;
        self
    }

    /// Event filter for this configuration
    pub fn env_filter(&self) -> EnvFilter {
        if self.force_level {
            EnvFilter::new(self.level.as_str())
        } else {
            EnvFilter::builder()
                .with_default_directive(self.level.into())
                .from_env_lossy()
        }
    }
}

/// Pick the most verbose level mentioned in an env-filter string
fn level_from_filter(filter: &str) -> Option<Level> {
    let filter = filter.to_lowercase();
    [
        ("trace", Level::TRACE),
        ("debug", Level::DEBUG),
        ("info", Level::INFO),
        ("warn", Level::WARN),
        ("error", Level::ERROR),
    ]
    .into_iter()
    .find(|(name, _)| filter.contains(name))
    .map(|(_, level)| level)
}

/// Initialize logging with the given configuration
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = config.env_filter();

    let format = fmt::format()
        .with_level(true)
        .with_target(true)
        .with_thread_ids(config.thread_ids);

    let file_layer = match config.file_path {
        Some(file_path) => {
            let directory = file_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&directory)?;

            let file_name = file_path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| DEFAULT_LOG_FILE.into());
            let file_appender = tracing_appender::rolling::daily(directory, file_name);

            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .event_format(format.clone()),
            )
        }
        None => None,
    };

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .event_format(format)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_filter() {
        assert_eq!(level_from_filter("debug"), Some(Level::DEBUG));
        assert_eq!(
            level_from_filter("nodemcu_bridge=trace,reqwest=warn"),
            Some(Level::TRACE)
        );
        assert_eq!(level_from_filter("WARN"), Some(Level::WARN));
        assert_eq!(level_from_filter("off"), None);
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.stderr);
        assert!(config.file_path.is_none());

        let config = config.with_level(Level::DEBUG);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.force_level);
    }

    #[test]
    fn test_forced_level_overrides_rust_log() {
        std::env::set_var("RUST_LOG", "warn");

        let debug_enabled = |config: &LogConfig| {
            let subscriber = tracing_subscriber::registry().with(config.env_filter());
            tracing::subscriber::with_default(subscriber, || tracing::enabled!(Level::DEBUG))
        };

        assert!(!debug_enabled(&LogConfig::from_env()));
        assert!(debug_enabled(&LogConfig::from_env().with_level(Level::DEBUG)));

        std::env::remove_var("RUST_LOG");
    }
}
