//! Cross-cutting policies composed around a test's verification step.
//!
//! Policies run in the order a test lists them, outermost first, before the
//! safety check and before collection. A [`PolicyDecision::Skip`] stops the
//! chain and the verification step never runs.

use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::warn;

/// What a policy decided before verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Continue,
    Skip(String),
}

/// Test and device a policy is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub test: &'a str,
    pub device: &'a str,
    pub hardware_model: &'a str,
}

/// A before-hook around construction and verification.
pub trait Policy: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Runs once when a test instance is built.
    fn on_construct(&self, _ctx: &PolicyContext<'_>) {}

    /// Runs when verification starts on an instance whose result is unset.
    fn before_verify(&self, _ctx: &PolicyContext<'_>) -> PolicyDecision {
        PolicyDecision::Continue
    }
}

/// Skip the test on listed hardware models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSkip {
    platforms: BTreeSet<String>,
}

impl PlatformSkip {
    pub fn new<I, S>(platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            platforms: platforms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn platforms(&self) -> &BTreeSet<String> {
        &self.platforms
    }
}

impl Policy for PlatformSkip {
    fn name(&self) -> &'static str {
        "platform_skip"
    }

    fn before_verify(&self, ctx: &PolicyContext<'_>) -> PolicyDecision {
        if !self.platforms.contains(ctx.hardware_model) {
            return PolicyDecision::Continue;
        }
        warn!(
            test = %ctx.test,
            device = %ctx.device,
            hardware_model = %ctx.hardware_model,
            "Skipping test on unsupported platform"
        );
        PolicyDecision::Skip(format!(
            "{} test is not supported on {}.",
            ctx.test, ctx.hardware_model
        ))
    }
}

/// Where a deprecation warning is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeprecationStage {
    #[default]
    Construct,
    Verify,
}

/// Log a warning that the test is deprecated. Never changes the result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deprecated {
    replacements: Vec<String>,
    stage: DeprecationStage,
}

impl Deprecated {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name tests that supersede this one.
    #[must_use]
    pub fn replaced_by<I, S>(mut self, tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replacements = tests.into_iter().map(Into::into).collect();
        self
    }

    /// Warn when verification starts instead of at construction.
    #[must_use]
    pub fn at_verify(mut self) -> Self {
        self.stage = DeprecationStage::Verify;
        self
    }

    pub fn message(&self, test: &str) -> String {
        if self.replacements.is_empty() {
            format!("{test} test is deprecated.")
        } else {
            format!(
                "{test} test is deprecated. Consider using the following new tests: {}.",
                self.replacements.join(", ")
            )
        }
    }

    fn warn(&self, ctx: &PolicyContext<'_>) {
        warn!(test = %ctx.test, device = %ctx.device, "{}", self.message(ctx.test));
    }
}

impl Policy for Deprecated {
    fn name(&self) -> &'static str {
        "deprecated"
    }

    fn on_construct(&self, ctx: &PolicyContext<'_>) {
        if self.stage == DeprecationStage::Construct {
            self.warn(ctx);
        }
    }

    fn before_verify(&self, ctx: &PolicyContext<'_>) -> PolicyDecision {
        if self.stage == DeprecationStage::Verify {
            self.warn(ctx);
        }
        PolicyDecision::Continue
    }
}
