//! Logging bootstrap shared by netvet binaries and embedding applications.
//!
//! ```ignore
//! let mut log_config = LogConfig::from_env("info").with_stderr();
//! if verbose {
//!     log_config = log_config.with_level("debug");
//! }
//! let _logging_guards = init_logging(&log_config)?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::EnvParser;
use crate::errors::ErrorCode;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!(
                "unknown log format '{other}' (expected pretty, json or compact)"
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Logging setup.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Filter directive, usually a bare level such as `info`.
    pub level: String,
    pub format: LogFormat,
    /// Write human-facing lines to stderr.
    pub stderr: bool,
    /// Also write JSON lines to this file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            stderr: false,
            file: None,
        }
    }
}

impl LogConfig {
    /// Read `NETVET_LOG_LEVEL`, `NETVET_LOG_FORMAT` and `NETVET_LOG_FILE`.
    ///
    /// Invalid values fall back to the defaults; use
    /// [`load_config`](crate::config::load_config) to have them reported.
    pub fn from_env(default_level: &str) -> Self {
        let mut parser = EnvParser::new();
        let level = parser.get_log_level("LOG_LEVEL", default_level).value;
        let format = parser.get_log_format("LOG_FORMAT").value.unwrap_or_default();
        let file = parser.get_optional_path("LOG_FILE").value;

        Self {
            level,
            format,
            stderr: false,
            file,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.level).map_err(|e| LoggingError::InvalidFilter {
            directive: self.level.clone(),
            reason: e.to_string(),
        })
    }
}

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("cannot open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized(#[source] tracing_subscriber::util::TryInitError),
}

impl LoggingError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InternalLoggingError
    }
}

/// Keeps background log writers alive; drop it on shutdown to flush.
#[must_use = "dropping the guards stops the file writer"]
#[derive(Debug, Default)]
pub struct LoggingGuards {
    file_guard: Option<WorkerGuard>,
}

impl LoggingGuards {
    pub fn has_file_writer(&self) -> bool {
        self.file_guard.is_some()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn open_file_writer(path: &Path) -> Result<(BoxedLayer, WorkerGuard), LoggingError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|source| LoggingError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path.file_name().ok_or_else(|| LoggingError::File {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
    })?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .boxed();
    Ok((layer, guard))
}

/// Install the global subscriber described by `config`.
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuards, LoggingError> {
    let filter = config.filter()?;
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guards = LoggingGuards::default();

    if config.stderr || config.file.is_none() {
        layers.push(stderr_layer(config.format));
    }
    if let Some(path) = &config.file {
        let (layer, guard) = open_file_writer(path)?;
        layers.push(layer);
        guards.file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(LoggingError::AlreadyInitialized)?;

    Ok(guards)
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::config::env_test_lock;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_builder_methods() {
        let config = LogConfig::default()
            .with_level("debug")
            .with_format(LogFormat::Compact)
            .with_stderr()
            .with_file("/tmp/netvet.log");
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.stderr);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/netvet.log")));
    }

    #[test]
    fn test_from_env_reads_variables() {
        let _guard = env_test_lock();
        // SAFETY: Tests hold env_test_lock, no concurrent access to env vars
        unsafe {
            std::env::set_var("NETVET_LOG_LEVEL", "warn");
            std::env::set_var("NETVET_LOG_FORMAT", "json");
            std::env::remove_var("NETVET_LOG_FILE");
        }

        let config = LogConfig::from_env("info");
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.file.is_none());

        // SAFETY: Tests hold env_test_lock, no concurrent access to env vars
        unsafe {
            std::env::set_var("NETVET_LOG_FORMAT", "fancy");
        }
        assert_eq!(LogConfig::from_env("info").format, LogFormat::Pretty);

        // SAFETY: Tests hold env_test_lock, no concurrent access to env vars
        unsafe {
            std::env::remove_var("NETVET_LOG_LEVEL");
            std::env::remove_var("NETVET_LOG_FORMAT");
        }
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        let config = LogConfig::default().with_level("netvet=loudest");
        let err = init_logging(&config).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
        assert_eq!(err.code().code_string(), "NV-E500");
    }

    #[test]
    fn test_second_init_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::default().with_file(dir.path().join("engine.log"));

        // The first call may lose the race to another test's subscriber.
        let _first = init_logging(&config);
        let second = init_logging(&config);
        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }
}
