//! Startup validation of the engine configuration.

use regex::Regex;
use serde::Serialize;

use super::{ConfigError, EngineConfig};

/// How serious a configuration finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A non-fatal configuration finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
    pub severity: Severity,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config`, returning warnings for values that will be adjusted and
/// an error for values that cannot be used.
pub fn validate_config(config: &EngineConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut warnings = Vec::new();

    for pattern in &config.extra_blocked_patterns {
        Regex::new(pattern).map_err(|e| ConfigError::Validation {
            field: "extra_blocked_patterns",
            reason: format!("invalid pattern '{pattern}': {e}"),
        })?;
    }

    if config.max_concurrency == 0 {
        warnings.push(ConfigWarning {
            field: "max_concurrency",
            message: "0 is not a usable concurrency, raised to 1".to_string(),
            severity: Severity::Warning,
        });
    }

    if config.correlation_prefix.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "correlation_prefix",
            reason: "must not be empty".to_string(),
        });
    }
    if config.correlation_prefix.chars().any(char::is_whitespace) {
        warnings.push(ConfigWarning {
            field: "correlation_prefix",
            message: "contains whitespace, device logs may split the id".to_string(),
            severity: Severity::Info,
        });
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_clean() {
        assert!(validate_config(&EngineConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let config = EngineConfig {
            extra_blocked_patterns: vec!["^copy(".to_string()],
            ..EngineConfig::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("^copy("));
        assert_eq!(err.code().code_string(), "NV-E203");
    }

    #[test]
    fn test_zero_concurrency_warns() {
        let config = EngineConfig {
            max_concurrency: 0,
            ..EngineConfig::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "max_concurrency");
        assert_eq!(warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_empty_prefix_is_error() {
        let config = EngineConfig {
            correlation_prefix: "  ".to_string(),
            ..EngineConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
