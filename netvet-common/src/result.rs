//! Per-(test, device) verdicts.
//!
//! A [`TestResult`] starts `unset` and only ever moves towards stronger
//! verdicts:
//!
//! | from \ to | success | failure | skipped | error |
//! |-----------|---------|---------|---------|-------|
//! | unset     | yes     | yes     | yes     | yes   |
//! | success   | yes     | yes     | yes     | yes   |
//! | failure   | no      | yes     | no      | yes   |
//! | skipped   | no      | no      | yes     | yes   |
//! | error     | no      | no      | no      | yes   |
//!
//! Rejected transitions are ignored and their message is dropped. There is
//! no way back to `unset`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inputs::ResultOverwrite;

/// Status of a test run against one device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    #[default]
    Unset,
    Success,
    Failure,
    Error,
    Skipped,
}

impl TestStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Unset => 0,
            Self::Success => 1,
            Self::Failure | Self::Skipped => 2,
            Self::Error => 3,
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn accepts(self, next: TestStatus) -> bool {
        next != Self::Unset && (self == next || next.rank() > self.rank())
    }

    pub fn is_unset(self) -> bool {
        self == Self::Unset
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Error => write!(f, "error"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Verdict container for one test run on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestResult {
    /// Device the test ran against.
    pub device: String,
    /// Test name.
    pub test: String,
    /// Category tags.
    pub categories: Vec<String>,
    /// Free-text description.
    pub description: String,
    /// Current verdict.
    status: TestStatus,
    /// Ordered human-readable messages.
    messages: Vec<String>,
    /// Optional operator-provided tag copied from the result overwrite block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field: Option<String>,
}

impl TestResult {
    pub fn new(
        device: impl Into<String>,
        test: impl Into<String>,
        categories: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            test: test.into(),
            categories,
            description: description.into(),
            status: TestStatus::Unset,
            messages: Vec::new(),
            custom_field: None,
        }
    }

    pub fn status(&self) -> TestStatus {
        self.status
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_unset(&self) -> bool {
        self.status.is_unset()
    }

    /// Replace metadata with whatever the overwrite block provides.
    pub fn apply_overwrite(&mut self, overwrite: &ResultOverwrite) {
        if let Some(description) = &overwrite.description {
            self.description = description.clone();
        }
        if let Some(categories) = &overwrite.categories {
            self.categories = categories.clone();
        }
        if let Some(custom_field) = &overwrite.custom_field {
            self.custom_field = Some(custom_field.clone());
        }
    }

    pub fn set_success(&mut self) -> bool {
        self.transition(TestStatus::Success, None)
    }

    pub fn set_success_with(&mut self, message: impl Into<String>) -> bool {
        self.transition(TestStatus::Success, Some(message.into()))
    }

    pub fn set_failure(&mut self, message: impl Into<String>) -> bool {
        self.transition(TestStatus::Failure, Some(message.into()))
    }

    pub fn set_skipped(&mut self, message: impl Into<String>) -> bool {
        self.transition(TestStatus::Skipped, Some(message.into()))
    }

    pub fn set_error(&mut self, message: impl Into<String>) -> bool {
        self.transition(TestStatus::Error, Some(message.into()))
    }

    /// Append a message without changing the status.
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn transition(&mut self, next: TestStatus, message: Option<String>) -> bool {
        if !self.status.accepts(next) {
            debug!(
                test = %self.test,
                device = %self.device,
                current = %self.status,
                rejected = %next,
                "Ignoring status transition"
            );
            return false;
        }
        self.status = next;
        if let Some(message) = message {
            self.messages.push(message);
        }
        true
    }
}

impl std::fmt::Display for TestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}: {}", self.test, self.device, self.status)?;
        if !self.messages.is_empty() {
            write!(f, " ({})", self.messages.join("; "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> TestResult {
        TestResult::new("leaf1", "VerifyVersion", vec!["software".into()], "Checks version")
    }

    #[test]
    fn test_new_result_is_unset() {
        let r = result();
        assert_eq!(r.status(), TestStatus::Unset);
        assert!(r.messages().is_empty());
    }

    #[test]
    fn test_success_then_failure_is_failure() {
        let mut r = result();
        assert!(r.set_success());
        assert!(r.set_failure("wrong version"));
        assert_eq!(r.status(), TestStatus::Failure);
        assert_eq!(r.messages(), &["wrong version".to_string()]);
    }

    #[test]
    fn test_terminal_states_reject_success() {
        let setters: [fn(&mut TestResult) -> bool; 3] = [
            |r| r.set_failure("first"),
            |r| r.set_error("first"),
            |r| r.set_skipped("first"),
        ];
        for setter in setters {
            let mut r = result();
            assert!(setter(&mut r));
            let before = r.clone();
            assert!(!r.set_success());
            assert!(!r.set_success_with("late"));
            assert_eq!(r, before);
        }
    }

    #[test]
    fn test_failure_accumulates_messages() {
        let mut r = result();
        r.set_failure("Ethernet1 down");
        r.set_failure("Ethernet2 down");
        assert_eq!(r.messages().len(), 2);
    }

    #[test]
    fn test_error_overrides_failure_but_not_reverse() {
        let mut r = result();
        r.set_failure("bad");
        assert!(r.set_error("boom"));
        assert!(!r.set_failure("again"));
        assert_eq!(r.status(), TestStatus::Error);
    }

    #[test]
    fn test_skipped_and_failure_do_not_mix() {
        let mut r = result();
        r.set_skipped("not applicable");
        assert!(!r.set_failure("bad"));
        assert_eq!(r.status(), TestStatus::Skipped);
    }

    #[test]
    fn test_unset_is_never_accepted() {
        for from in [
            TestStatus::Unset,
            TestStatus::Success,
            TestStatus::Failure,
            TestStatus::Error,
            TestStatus::Skipped,
        ] {
            assert!(!from.accepts(TestStatus::Unset));
        }
    }

    #[test]
    fn test_apply_overwrite() {
        let mut r = result();
        r.apply_overwrite(&ResultOverwrite {
            description: Some("Custom".into()),
            categories: Some(vec!["ops".into()]),
            custom_field: Some("ticket-42".into()),
        });
        assert_eq!(r.description, "Custom");
        assert_eq!(r.categories, vec!["ops".to_string()]);
        assert_eq!(r.custom_field.as_deref(), Some("ticket-42"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TestStatus::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
    }
}
