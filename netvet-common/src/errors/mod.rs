//! Error taxonomy for test execution.
//!
//! Every failure a test instance can hit is recovered locally and reported
//! through its [`TestResult`](crate::result::TestResult). [`ExecutionError`]
//! names each kind, renders the operator-facing message, and maps to a code
//! in the [catalog](catalog).
//!
//! # Error Code Ranges
//!
//! | Range      | Category    | Description                          |
//! |------------|-------------|--------------------------------------|
//! | E001-E099  | Test        | Test instance lifecycle failures     |
//! | E100-E199  | Device      | Collection and transport failures    |
//! | E200-E299  | Config      | Configuration and environment errors |
//! | E500-E599  | Internal    | Internal/unexpected errors           |

pub mod catalog;

pub use catalog::{ErrorCategory, ErrorCode, ErrorEntry};

use thiserror::Error;

use crate::inputs::InputError;
use crate::result::TestStatus;
use crate::template::RenderError;

/// Everything that can stop a test instance short of a clean verdict.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Raw inputs rejected by the input schema.
    #[error("Inputs are not valid: {0}")]
    InputValidation(#[from] InputError),

    /// Template parameters did not match or the render hook failed.
    #[error("Test initialization error: {0}")]
    Render(#[from] RenderError),

    /// Pre-supplied outputs do not line up with the commands.
    #[error(
        "Test initialization error: {supplied} output(s) supplied for {expected} command(s)"
    )]
    InitializationCountMismatch { supplied: usize, expected: usize },

    /// The device reported errors for a command.
    #[error("{command} has failed: {errors}")]
    CommandFailed { command: String, errors: String },

    /// Every error of the command says the platform lacks it.
    #[error("{command} is not supported on {platform}")]
    UnsupportedCommand { command: String, platform: String },

    /// The command matched the safety block list.
    #[error("<{command}> is blocked for security reason matching {pattern}")]
    SafetyBlocked { command: String, pattern: String },

    /// The collection call itself failed.
    #[error("Collection failed: {0}")]
    Collection(String),

    /// The verification function returned an error or panicked.
    #[error("{0}")]
    Verification(String),

    /// The verification function returned without setting a status.
    #[error("{test} returned without setting a status")]
    UnsetResult { test: String },
}

impl ExecutionError {
    /// Catalog code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InputValidation(_) => ErrorCode::TestInputValidation,
            Self::Render(_) => ErrorCode::TestRenderFailed,
            Self::InitializationCountMismatch { .. } => ErrorCode::TestOutputCountMismatch,
            Self::CommandFailed { .. } => ErrorCode::TestCommandFailed,
            Self::UnsupportedCommand { .. } => ErrorCode::TestUnsupportedCommand,
            Self::SafetyBlocked { .. } => ErrorCode::TestCommandBlocked,
            Self::Collection(_) => ErrorCode::DeviceCollectionFailed,
            Self::Verification(_) => ErrorCode::TestVerificationFailed,
            Self::UnsetResult { .. } => ErrorCode::TestUnsetResult,
        }
    }

    /// Status this error resolves to on the result.
    pub fn status(&self) -> TestStatus {
        match self {
            Self::UnsupportedCommand { .. } => TestStatus::Skipped,
            Self::UnsetResult { .. } => TestStatus::Unset,
            _ => TestStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = ExecutionError::CommandFailed {
            command: "show version".into(),
            errors: "Invalid input".into(),
        };
        assert_eq!(err.to_string(), "show version has failed: Invalid input");
        assert_eq!(err.code().code_string(), "NV-E004");
    }

    #[test]
    fn test_status_mapping() {
        let unsupported = ExecutionError::UnsupportedCommand {
            command: "show hardware capacity".into(),
            platform: "vEOS-lab".into(),
        };
        assert_eq!(unsupported.status(), TestStatus::Skipped);

        let unset = ExecutionError::UnsetResult {
            test: "VerifyUptime".into(),
        };
        assert_eq!(unset.status(), TestStatus::Unset);

        let blocked = ExecutionError::SafetyBlocked {
            command: "reload".into(),
            pattern: "^reload.*".into(),
        };
        assert_eq!(blocked.status(), TestStatus::Error);
        assert!(blocked.to_string().starts_with("<reload> is blocked"));
    }

    #[test]
    fn test_count_mismatch_message() {
        let err = ExecutionError::InitializationCountMismatch {
            supplied: 3,
            expected: 2,
        };
        assert!(err.to_string().contains("3 output(s) supplied for 2 command(s)"));
    }
}
