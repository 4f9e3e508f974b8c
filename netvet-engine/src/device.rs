//! The device collaborator: whatever sends commands to a network device.
//!
//! The transport is injected. An implementation populates each command's
//! output or errors in place and only returns an error for failures that
//! cannot be pinned on a single command. Caching and single-flight of
//! identical requests belong to the implementation, keyed by
//! [`Command::uid`] and gated by [`Command::use_cache`].

use async_trait::async_trait;
use netvet_common::Command;
use netvet_common::errors::ErrorCode;
use std::collections::BTreeSet;
use thiserror::Error;

/// Transport-level collection failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("{device} is unreachable: {reason}")]
    Unreachable { device: String, reason: String },

    #[error("collection on {device} timed out after {elapsed_ms} ms")]
    Timeout { device: String, elapsed_ms: u64 },

    #[error("collection on {device} failed: {message}")]
    Transport { device: String, message: String },
}

impl DeviceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unreachable { .. } => ErrorCode::DeviceUnreachable,
            Self::Timeout { .. } => ErrorCode::DeviceTimeout,
            Self::Transport { .. } => ErrorCode::DeviceCollectionFailed,
        }
    }
}

/// A device that can collect command outputs.
#[async_trait]
pub trait Device: Send + Sync {
    /// Identifier used in results and logs.
    fn name(&self) -> &str;

    /// Hardware model reported by the device, used by platform policies.
    fn hardware_model(&self) -> &str;

    /// Inventory tags matched against catalog filters.
    fn tags(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Populate `output` or `errors` of every command, in order.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] for failures not attributable to one command.
    async fn collect(
        &self,
        commands: &mut [Command],
        correlation_id: &str,
    ) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DeviceError::Timeout {
            device: "leaf1".into(),
            elapsed_ms: 30_000,
        };
        assert_eq!(err.code().code_string(), "NV-E102");
        assert_eq!(err.to_string(), "collection on leaf1 timed out after 30000 ms");

        let err = DeviceError::Unreachable {
            device: "leaf1".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(err.code(), ErrorCode::DeviceUnreachable);
    }
}
