//! What a network test declares and implements.
//!
//! A test definition is built once and shared by every instance through an
//! `Arc`. Its declared commands and templates are never mutated: each
//! instance gets its own copies, so outputs collected for one instance are
//! invisible to every other instance.

use anyhow::Context;
use netvet_common::{Command, RenderError, Template, TestResult};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::policy::Policy;

/// A command or template declared by a test.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Command(Command),
    Template(Template),
}

impl From<Command> for Declaration {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<Template> for Declaration {
    fn from(template: Template) -> Self {
        Self::Template(template)
    }
}

/// A network test.
///
/// ```ignore
/// struct VerifyEosVersion {
///     commands: Vec<Declaration>,
/// }
///
/// impl NetworkTest for VerifyEosVersion {
///     type Input = VersionInput;
///
///     fn name(&self) -> &str { "VerifyEOSVersion" }
///     fn description(&self) -> &str { "Verifies the EOS version" }
///     fn categories(&self) -> &[&str] { &["software"] }
///     fn commands(&self) -> &[Declaration] { &self.commands }
///
///     fn test(&self, ctx: &mut TestContext<'_, VersionInput>) -> anyhow::Result<()> {
///         let version = ctx.json(0)?["version"].as_str().unwrap_or_default();
///         if ctx.inputs.versions.iter().any(|v| v == version) {
///             ctx.result.set_success();
///         } else {
///             ctx.result.set_failure(format!("device is running version \"{version}\""));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait NetworkTest: Send + Sync + 'static {
    /// Test-specific inputs. Keys missing from the type's JSON schema are
    /// rejected before deserialization.
    type Input: DeserializeOwned + JsonSchema + Send + Sync + 'static;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn categories(&self) -> &[&str];

    /// Commands and templates in collection order.
    fn commands(&self) -> &[Declaration];

    /// Expand one declared template into concrete commands.
    ///
    /// Tests that declare templates must override this.
    fn render(&self, _input: &Self::Input, template: &Template) -> Result<Vec<Command>, RenderError> {
        Err(RenderError::NotImplemented {
            test: self.name().to_string(),
            template: template.text().to_string(),
        })
    }

    /// Policies wrapped around verification, outermost first.
    fn policies(&self) -> Vec<Arc<dyn Policy>> {
        Vec::new()
    }

    /// Inspect collected outputs and set a verdict on `ctx.result`.
    ///
    /// Returning an error, or panicking, sets the result to `error`.
    /// Returning `Ok` without setting a status leaves the result unset.
    fn test(&self, ctx: &mut TestContext<'_, Self::Input>) -> anyhow::Result<()>;
}

/// What a verification step can see and write.
pub struct TestContext<'a, I> {
    pub inputs: &'a I,
    pub commands: &'a [Command],
    pub result: &'a mut TestResult,
    pub hardware_model: &'a str,
}

impl<I> TestContext<'_, I> {
    /// Command at `index`, in declaration order.
    pub fn command(&self, index: usize) -> anyhow::Result<&Command> {
        self.commands
            .get(index)
            .with_context(|| format!("no command at index {index} ({} declared)", self.commands.len()))
    }

    /// Structured output of the command at `index`.
    pub fn json(&self, index: usize) -> anyhow::Result<&Value> {
        Ok(self.command(index)?.json_output()?)
    }

    /// Text output of the command at `index`.
    pub fn text(&self, index: usize) -> anyhow::Result<&str> {
        Ok(self.command(index)?.text_output()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netvet_common::{NoInput, OutputFormat};
    use serde_json::json;

    struct Bare {
        commands: Vec<Declaration>,
    }

    impl NetworkTest for Bare {
        type Input = NoInput;

        fn name(&self) -> &str {
            "VerifyBare"
        }

        fn description(&self) -> &str {
            "bare"
        }

        fn categories(&self) -> &[&str] {
            &["system"]
        }

        fn commands(&self) -> &[Declaration] {
            &self.commands
        }

        fn test(&self, _ctx: &mut TestContext<'_, NoInput>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_render_is_not_implemented() {
        let template = Template::new("show ip route vrf {vrf}").unwrap();
        let bare = Bare {
            commands: vec![template.clone().into()],
        };
        let err = bare.render(&NoInput {}, &template).unwrap_err();
        assert_eq!(
            err,
            RenderError::NotImplemented {
                test: "VerifyBare".into(),
                template: "show ip route vrf {vrf}".into(),
            }
        );
        assert!(bare.policies().is_empty());
    }

    #[test]
    fn test_context_accessors() {
        let mut version = Command::new("show version");
        version.set_output(json!({"version": "4.30"}));
        let mut clock = Command::builder("show clock")
            .format(OutputFormat::Text)
            .build()
            .unwrap();
        clock.set_output("Mon Oct 19 2026");
        let commands = vec![version, clock];
        let mut result = TestResult::new("leaf1", "VerifyBare", vec![], "");

        let ctx = TestContext {
            inputs: &NoInput {},
            commands: &commands,
            result: &mut result,
            hardware_model: "vEOS-lab",
        };
        assert_eq!(ctx.json(0).unwrap()["version"], "4.30");
        assert_eq!(ctx.text(1).unwrap(), "Mon Oct 19 2026");
        assert!(ctx.json(1).is_err());
        let err = ctx.command(5).unwrap_err();
        assert!(err.to_string().contains("no command at index 5"));
    }
}
