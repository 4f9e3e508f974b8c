//! Error Catalog for netvet
//!
//! Every failure the engine can report carries a stable code in the
//! `NV-Exxx` format, a message, and remediation steps for operators.
//!
//! # Error Code Ranges
//!
//! | Range      | Category    | Description                              |
//! |------------|-------------|------------------------------------------|
//! | E001-E099  | Test        | Test instance lifecycle failures         |
//! | E100-E199  | Device      | Collection and transport failures        |
//! | E200-E299  | Config      | Configuration and environment errors     |
//! | E500-E599  | Internal    | Internal/unexpected errors               |

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code enumeration covering all netvet error scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Test Lifecycle Errors (E001-E099)
    // =========================================================================
    /// Raw inputs rejected by the input schema
    TestInputValidation,
    /// A template could not be rendered
    TestRenderFailed,
    /// Pre-supplied outputs do not match the command count
    TestOutputCountMismatch,
    /// The device reported errors for one or more commands
    TestCommandFailed,
    /// A command matched the safety block list
    TestCommandBlocked,
    /// The verification function raised an error or panicked
    TestVerificationFailed,
    /// The verification function returned without a verdict
    TestUnsetResult,
    /// All failed commands are unsupported on the platform
    TestUnsupportedCommand,

    // =========================================================================
    // Device Errors (E100-E199)
    // =========================================================================
    /// Collection call failed at the transport level
    DeviceCollectionFailed,
    /// Device could not be reached
    DeviceUnreachable,
    /// Collection timed out
    DeviceTimeout,

    // =========================================================================
    // Config Errors (E200-E299)
    // =========================================================================
    /// Configuration file not found
    ConfigNotFound,
    /// Configuration file could not be read
    ConfigReadError,
    /// Configuration file contains invalid TOML
    ConfigParseError,
    /// Configuration contains invalid values
    ConfigValidationError,
    /// Environment variable has invalid value
    ConfigEnvError,

    // =========================================================================
    // Internal Errors (E500-E599)
    // =========================================================================
    /// Logging subsystem could not be initialised
    InternalLoggingError,
}

impl ErrorCode {
    /// Returns the numeric error code (without prefix).
    #[must_use]
    pub const fn code_number(&self) -> u16 {
        match self {
            Self::TestInputValidation => 1,
            Self::TestRenderFailed => 2,
            Self::TestOutputCountMismatch => 3,
            Self::TestCommandFailed => 4,
            Self::TestCommandBlocked => 5,
            Self::TestVerificationFailed => 6,
            Self::TestUnsetResult => 7,
            Self::TestUnsupportedCommand => 8,

            Self::DeviceCollectionFailed => 100,
            Self::DeviceUnreachable => 101,
            Self::DeviceTimeout => 102,

            Self::ConfigNotFound => 200,
            Self::ConfigReadError => 201,
            Self::ConfigParseError => 202,
            Self::ConfigValidationError => 203,
            Self::ConfigEnvError => 204,

            Self::InternalLoggingError => 500,
        }
    }

    /// Returns the formatted error code string (e.g., "NV-E001").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("NV-E{:03}", self.code_number())
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            1..=99 => ErrorCategory::Test,
            100..=199 => ErrorCategory::Device,
            200..=299 => ErrorCategory::Config,
            _ => ErrorCategory::Internal,
        }
    }

    /// Returns the full error entry with all metadata.
    #[must_use]
    pub fn entry(&self) -> ErrorEntry {
        ErrorEntry {
            code: self.code_string(),
            category: self.category(),
            message: self.message().to_string(),
            remediation: self
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::TestInputValidation => "Test inputs are not valid",
            Self::TestRenderFailed => "Command template could not be rendered",
            Self::TestOutputCountMismatch => {
                "Number of supplied outputs does not match the number of commands"
            }
            Self::TestCommandFailed => "Device reported errors for a command",
            Self::TestCommandBlocked => "Command is blocked for safety reasons",
            Self::TestVerificationFailed => "Verification function raised an error",
            Self::TestUnsetResult => "Verification returned without setting a status",
            Self::TestUnsupportedCommand => "Command is not supported on this platform",
            Self::DeviceCollectionFailed => "Command collection failed",
            Self::DeviceUnreachable => "Device is unreachable",
            Self::DeviceTimeout => "Command collection timed out",
            Self::ConfigNotFound => "Configuration file not found",
            Self::ConfigReadError => "Failed to read configuration file",
            Self::ConfigParseError => "Configuration file contains invalid TOML syntax",
            Self::ConfigValidationError => "Configuration contains invalid values",
            Self::ConfigEnvError => "Environment variable has invalid value",
            Self::InternalLoggingError => "Failed to initialise logging",
        }
    }

    /// Returns remediation steps.
    #[must_use]
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::TestInputValidation => &[
                "Compare the catalog entry against the test's input fields",
                "Check for misspelled keys; unknown keys are rejected",
            ],
            Self::TestRenderFailed => &[
                "Ensure every template placeholder has a matching input value",
                "Check the test's render implementation for this template",
            ],
            Self::TestOutputCountMismatch => &[
                "Supply exactly one recorded output per test command",
                "Re-capture outputs if the test's command list changed",
            ],
            Self::TestCommandFailed => &[
                "Run the command manually on the device to inspect the error",
                "Check that the device software supports the command",
            ],
            Self::TestCommandBlocked => &[
                "Tests may only issue read-only commands",
                "Remove configuration, write or reload commands from the test",
            ],
            Self::TestVerificationFailed => &[
                "Inspect the message for the failing expression",
                "Compare the collected output shape with what the test expects",
            ],
            Self::TestUnsetResult => &[
                "Make every code path of the test set success, failure or skipped",
            ],
            Self::TestUnsupportedCommand => &[
                "Filter the test out for this platform with tags",
            ],
            Self::DeviceCollectionFailed => &[
                "Check device reachability and credentials",
                "Retry the run; transient transport errors are not retried automatically",
            ],
            Self::DeviceUnreachable => &[
                "Verify the management address and routing to the device",
            ],
            Self::DeviceTimeout => &[
                "Increase the transport timeout",
                "Check device CPU load",
            ],
            Self::ConfigNotFound => &[
                "Create ~/.config/netvet/config.toml or set NETVET_CONFIG",
            ],
            Self::ConfigReadError => &["Check file permissions on the configuration file"],
            Self::ConfigParseError => &[
                "Validate the TOML syntax of the configuration file",
            ],
            Self::ConfigValidationError => &[
                "Review the reported field and its allowed values",
            ],
            Self::ConfigEnvError => &[
                "Unset or correct the reported NETVET_* environment variable",
            ],
            Self::InternalLoggingError => &[
                "Check that the log file directory is writable",
                "Make sure logging is initialised only once per process",
            ],
        }
    }

    /// All error codes, in code order.
    #[must_use]
    pub fn all() -> &'static [ErrorCode] {
        &[
            Self::TestInputValidation,
            Self::TestRenderFailed,
            Self::TestOutputCountMismatch,
            Self::TestCommandFailed,
            Self::TestCommandBlocked,
            Self::TestVerificationFailed,
            Self::TestUnsetResult,
            Self::TestUnsupportedCommand,
            Self::DeviceCollectionFailed,
            Self::DeviceUnreachable,
            Self::DeviceTimeout,
            Self::ConfigNotFound,
            Self::ConfigReadError,
            Self::ConfigParseError,
            Self::ConfigValidationError,
            Self::ConfigEnvError,
            Self::InternalLoggingError,
        ]
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.message())
    }
}

/// Error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Test lifecycle errors (E001-E099)
    Test,
    /// Collection and transport errors (E100-E199)
    Device,
    /// Configuration errors (E200-E299)
    Config,
    /// Internal errors (E500-E599)
    Internal,
}

impl ErrorCategory {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Test => "Test",
            Self::Device => "Device",
            Self::Config => "Configuration",
            Self::Internal => "Internal",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Test => "Input, rendering, collection and verification failures of a test",
            Self::Device => "Transport-level failures while collecting command outputs",
            Self::Config => "Configuration file and environment setup issues",
            Self::Internal => "Internal errors that may indicate bugs",
        }
    }

    /// Code range covered by the category (e.g., "001-099").
    #[must_use]
    pub const fn code_range(&self) -> &'static str {
        match self {
            Self::Test => "001-099",
            Self::Device => "100-199",
            Self::Config => "200-299",
            Self::Internal => "500-599",
        }
    }

    #[must_use]
    pub fn all() -> &'static [ErrorCategory] {
        &[Self::Test, Self::Device, Self::Config, Self::Internal]
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Complete error entry with all metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorEntry {
    /// Error code string (e.g., "NV-E001")
    pub code: String,
    /// Error category
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Steps to remediate the error
    pub remediation: Vec<String>,
}

impl ErrorEntry {
    /// Formats the error for display with full remediation steps.
    #[must_use]
    pub fn format_full(&self) -> String {
        let mut output = format!("[{}] {}\n\n", self.code, self.message);

        if !self.remediation.is_empty() {
            output.push_str("Remediation steps:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        output
    }

    /// Formats the error as a single line.
    #[must_use]
    pub fn format_brief(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_brief())
    }
}
