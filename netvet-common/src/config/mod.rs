//! Configuration system for netvet.
//!
//! Values are resolved with the precedence defaults < TOML file <
//! `NETVET_*` environment variables, and each value remembers where it
//! came from:
//! - Environment variable parsing with type safety
//! - Source tracking for debugging
//! - Validation on startup

pub mod env;
pub mod source;
pub mod validate;

pub use env::{EnvError, EnvParser};
pub use source::{ConfigSource, Sourced};
pub use validate::{ConfigWarning, Severity, validate_config};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::errors::ErrorCode;
use crate::logging::{LogConfig, LogFormat};

pub const DEFAULT_CORRELATION_PREFIX: &str = "netvet";
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;
const MAX_CONCURRENCY_LIMIT: usize = 1024;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
    /// Patterns blocked in addition to the built-in deny list.
    pub extra_blocked_patterns: Vec<String>,
    /// Test instances run concurrently against one device.
    pub max_concurrency: usize,
    /// Leading component of every collection correlation id.
    pub correlation_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            log_file: None,
            extra_blocked_patterns: Vec::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            correlation_prefix: DEFAULT_CORRELATION_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    /// Logging setup matching this configuration.
    pub fn log_config(&self) -> LogConfig {
        let config = LogConfig::default()
            .with_level(self.log_level.clone())
            .with_format(self.log_format);
        match &self.log_file {
            Some(path) => config.with_file(path.clone()),
            None => config,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid environment: {}", join_env_errors(.0))]
    Env(Vec<EnvError>),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

fn join_env_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::ConfigNotFound,
            Self::Read { .. } => ErrorCode::ConfigReadError,
            Self::Parse { .. } => ErrorCode::ConfigParseError,
            Self::Env(_) => ErrorCode::ConfigEnvError,
            Self::Validation { .. } => ErrorCode::ConfigValidationError,
        }
    }
}

/// A resolved configuration with per-field provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EngineConfig,
    pub sources: BTreeMap<&'static str, ConfigSource>,
    pub warnings: Vec<ConfigWarning>,
}

impl LoadedConfig {
    pub fn source_of(&self, field: &str) -> ConfigSource {
        self.sources
            .get(field)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }
}

const FIELDS: [&str; 6] = [
    "log_level",
    "log_format",
    "log_file",
    "extra_blocked_patterns",
    "max_concurrency",
    "correlation_prefix",
];

/// `<config dir>/netvet/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("netvet").join("config.toml"))
}

/// Resolve the engine configuration.
///
/// `path` (or `NETVET_CONFIG`) names a file that must exist; otherwise the
/// default location is read when present.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let mut parser = EnvParser::new();
    let explicit = path
        .map(Path::to_path_buf)
        .or(parser.get_optional_path("CONFIG").value);

    let file = match explicit {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path)),
        Some(path) => Some(path),
        None => default_config_path().filter(|p| p.exists()),
    };

    let mut config = EngineConfig::default();
    let mut sources: BTreeMap<&'static str, ConfigSource> = FIELDS
        .iter()
        .map(|field| (*field, ConfigSource::Default))
        .collect();

    if let Some(path) = file {
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let parse_err = |source| ConfigError::Parse {
            path: path.clone(),
            source,
        };
        config = toml::from_str(&contents).map_err(parse_err)?;
        let keys: toml::Table = toml::from_str(&contents).map_err(parse_err)?;
        for field in FIELDS {
            if keys.contains_key(field) {
                sources.insert(field, ConfigSource::File(path.clone()));
            }
        }
        debug!(path = %path.display(), "loaded configuration file");
    }

    apply_env(&mut parser, &mut config, &mut sources);
    let env_errors = parser.take_errors();
    if !env_errors.is_empty() {
        return Err(ConfigError::Env(env_errors));
    }

    let warnings = validate_config(&config)?;
    if config.max_concurrency == 0 {
        config.max_concurrency = 1;
    }

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

fn apply_env(
    parser: &mut EnvParser,
    config: &mut EngineConfig,
    sources: &mut BTreeMap<&'static str, ConfigSource>,
) {
    let level = parser.get_log_level("LOG_LEVEL", &config.log_level);
    if level.is_from_env() {
        config.log_level = level.value;
        sources.insert("log_level", ConfigSource::Environment);
    }

    if let Some(format) = parser.get_log_format("LOG_FORMAT").value {
        config.log_format = format;
        sources.insert("log_format", ConfigSource::Environment);
    }

    let file = parser.get_optional_path("LOG_FILE");
    if file.is_from_env() {
        config.log_file = file.value;
        sources.insert("log_file", ConfigSource::Environment);
    }

    let concurrency = parser.get_bounded(
        "MAX_CONCURRENCY",
        config.max_concurrency,
        1,
        MAX_CONCURRENCY_LIMIT,
    );
    if concurrency.is_from_env() {
        config.max_concurrency = concurrency.value;
        sources.insert("max_concurrency", ConfigSource::Environment);
    }

    // Environment patterns extend the file's list, never replace it.
    let patterns = parser.get_string_list("BLOCKED_PATTERNS");
    if !patterns.value.is_empty() {
        config.extra_blocked_patterns.extend(patterns.value);
        sources.insert("extra_blocked_patterns", ConfigSource::Environment);
    }

    let prefix = parser.get_string("CORRELATION_PREFIX", &config.correlation_prefix);
    if prefix.is_from_env() {
        config.correlation_prefix = prefix.value;
        sources.insert("correlation_prefix", ConfigSource::Environment);
    }
}

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
