//! `NETVET_*` environment overrides.
//!
//! [`EnvParser`] reads one variable per call and keeps going after a bad
//! value, so every problem can be reported together by
//! [`load_config`](super::load_config).

use super::source::Sourced;
use crate::logging::LogFormat;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Prefix shared by every engine variable.
pub const ENV_PREFIX: &str = "NETVET_";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    #[error("Value out of range for {var}: {value} (valid: {min}..={max})")]
    OutOfRange {
        var: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid log level for {var}: {value} (expected one of {})", LOG_LEVELS.join(", "))]
    InvalidLogLevel { var: String, value: String },
}

/// Reads `NETVET_*` variables, collecting errors instead of failing.
#[derive(Debug, Default)]
pub struct EnvParser {
    errors: Vec<EnvError>,
}

impl EnvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors collected so far; the parser starts over empty.
    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// Full variable name and its value, when set to valid unicode.
    fn lookup(name: &str) -> (String, Option<String>) {
        let var = format!("{ENV_PREFIX}{name}");
        let value = env::var(&var).ok();
        (var, value)
    }

    pub fn get_string(&mut self, name: &str, default: &str) -> Sourced<String> {
        match Self::lookup(name) {
            (var, Some(value)) => Sourced::from_env(value, var),
            (_, None) => Sourced::default_value(default.to_string()),
        }
    }

    /// A number within `min..=max`. Bad values keep `default` and record
    /// an error.
    pub fn get_bounded<T>(&mut self, name: &str, default: T, min: T, max: T) -> Sourced<T>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let (var, Some(raw)) = Self::lookup(name) else {
            return Sourced::default_value(default);
        };
        match raw.trim().parse::<T>() {
            Ok(n) if n >= min && n <= max => Sourced::from_env(n, var),
            Ok(n) => {
                self.errors.push(EnvError::OutOfRange {
                    var,
                    value: n.to_string(),
                    min: min.to_string(),
                    max: max.to_string(),
                });
                Sourced::default_value(default)
            }
            Err(_) => {
                self.errors.push(EnvError::InvalidValue {
                    var,
                    expected: format!("an integer in {min}..={max}"),
                    value: raw,
                });
                Sourced::default_value(default)
            }
        }
    }

    /// A tracing level name, lowercased.
    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let (var, Some(raw)) = Self::lookup(name) else {
            return Sourced::default_value(default.to_string());
        };
        let level = raw.trim().to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            Sourced::from_env(level, var)
        } else {
            self.errors.push(EnvError::InvalidLogLevel { var, value: raw });
            Sourced::default_value(default.to_string())
        }
    }

    /// `pretty`, `json` or `compact`; `None` when unset, empty or invalid.
    pub fn get_log_format(&mut self, name: &str) -> Sourced<Option<LogFormat>> {
        let (var, raw) = Self::lookup(name);
        match raw.filter(|v| !v.trim().is_empty()) {
            None => Sourced::default_value(None),
            Some(raw) => match raw.parse::<LogFormat>() {
                Ok(format) => Sourced::from_env(Some(format), var),
                Err(_) => {
                    self.errors.push(EnvError::InvalidValue {
                        var,
                        expected: "pretty, json or compact".to_string(),
                        value: raw,
                    });
                    Sourced::default_value(None)
                }
            },
        }
    }

    /// Comma-separated entries with blanks dropped. An empty variable is
    /// an explicit empty list.
    pub fn get_string_list(&mut self, name: &str) -> Sourced<Vec<String>> {
        match Self::lookup(name) {
            (var, Some(raw)) => {
                let items = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                Sourced::from_env(items, var)
            }
            (_, None) => Sourced::default_value(Vec::new()),
        }
    }

    /// A path with `~/` expanded. Empty counts as unset.
    pub fn get_optional_path(&mut self, name: &str) -> Sourced<Option<PathBuf>> {
        match Self::lookup(name) {
            (var, Some(raw)) if !raw.is_empty() => Sourced::from_env(Some(expand_home(&raw)), var),
            _ => Sourced::default_value(None),
        }
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(value: &str) -> PathBuf {
    if let Some(stripped) = value.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(value)
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::config::env_test_lock;

    fn unset(var: &str) {
        // SAFETY: Tests hold env_test_lock, no concurrent access to env vars
        unsafe { env::remove_var(var) };
    }

    fn set(var: &str, value: &str) {
        // SAFETY: Tests hold env_test_lock, no concurrent access to env vars
        unsafe { env::set_var(var, value) };
    }

    #[test]
    fn test_string_default_and_override() {
        let _guard = env_test_lock();
        unset("NETVET_TEST_PREFIX");

        let mut parser = EnvParser::new();
        let value = parser.get_string("TEST_PREFIX", "netvet");
        assert_eq!(value.value, "netvet");
        assert!(!value.is_from_env());

        set("NETVET_TEST_PREFIX", "ci");
        let value = parser.get_string("TEST_PREFIX", "netvet");
        assert_eq!(value.value, "ci");
        assert_eq!(value.var_name.as_deref(), Some("NETVET_TEST_PREFIX"));

        unset("NETVET_TEST_PREFIX");
    }

    #[test]
    fn test_bounded_values() {
        let _guard = env_test_lock();
        let mut parser = EnvParser::new();

        set("NETVET_TEST_WORKERS", " 32 ");
        assert_eq!(parser.get_bounded("TEST_WORKERS", 16u32, 1, 1024).value, 32);
        assert!(parser.take_errors().is_empty());

        set("NETVET_TEST_WORKERS", "4096");
        let value = parser.get_bounded("TEST_WORKERS", 16u32, 1, 1024);
        assert_eq!(value.value, 16);
        assert!(!value.is_from_env());

        set("NETVET_TEST_WORKERS", "many");
        assert_eq!(parser.get_bounded("TEST_WORKERS", 16u32, 1, 1024).value, 16);

        let errors = parser.take_errors();
        assert!(matches!(errors[0], EnvError::OutOfRange { .. }));
        assert!(matches!(errors[1], EnvError::InvalidValue { .. }));
        assert!(parser.take_errors().is_empty());

        unset("NETVET_TEST_WORKERS");
    }

    #[test]
    fn test_log_level_and_format() {
        let _guard = env_test_lock();
        let mut parser = EnvParser::new();

        set("NETVET_TEST_LEVEL", "DEBUG");
        assert_eq!(parser.get_log_level("TEST_LEVEL", "info").value, "debug");
        set("NETVET_TEST_LEVEL", "loud");
        assert_eq!(parser.get_log_level("TEST_LEVEL", "info").value, "info");

        set("NETVET_TEST_FORMAT", "json");
        assert_eq!(parser.get_log_format("TEST_FORMAT").value, Some(LogFormat::Json));
        set("NETVET_TEST_FORMAT", "xml");
        assert_eq!(parser.get_log_format("TEST_FORMAT").value, None);

        let errors = parser.take_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("trace, debug, info"));

        unset("NETVET_TEST_LEVEL");
        unset("NETVET_TEST_FORMAT");
    }

    #[test]
    fn test_string_list() {
        let _guard = env_test_lock();
        let mut parser = EnvParser::new();

        unset("NETVET_TEST_LIST");
        assert!(!parser.get_string_list("TEST_LIST").is_from_env());

        set("NETVET_TEST_LIST", "^copy.*, ,^delete.*");
        let list = parser.get_string_list("TEST_LIST");
        assert_eq!(list.value, vec!["^copy.*".to_string(), "^delete.*".to_string()]);

        set("NETVET_TEST_LIST", "");
        let list = parser.get_string_list("TEST_LIST");
        assert!(list.is_from_env());
        assert!(list.value.is_empty());

        unset("NETVET_TEST_LIST");
    }

    #[test]
    fn test_optional_path_expands_home() {
        let _guard = env_test_lock();
        let mut parser = EnvParser::new();

        unset("NETVET_TEST_PATH");
        assert!(parser.get_optional_path("TEST_PATH").value.is_none());

        set("NETVET_TEST_PATH", "/var/log/netvet.log");
        let path = parser.get_optional_path("TEST_PATH");
        assert_eq!(path.value, Some(PathBuf::from("/var/log/netvet.log")));

        if let Some(home) = dirs::home_dir() {
            set("NETVET_TEST_PATH", "~/netvet.log");
            let path = parser.get_optional_path("TEST_PATH");
            assert_eq!(path.value, Some(home.join("netvet.log")));
        }

        unset("NETVET_TEST_PATH");
    }
}
