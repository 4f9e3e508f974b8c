//! One test bound to one device and one set of inputs.
//!
//! Construction validates inputs, expands declarations into instance-owned
//! commands and copies replayed outputs. [`TestInstance::run`] then drives
//! policies, the safety check, collection, error classification and the
//! verification step. Every failure is recorded on the instance's
//! [`TestResult`]; nothing propagates to the caller.

use netvet_common::util::{mask_sensitive_command, panic_message, sanitize_message};
use netvet_common::{
    Command, CommandOutput, ExecutionError, RenderError, TestInputs, TestResult, TestStatus,
};
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::definition::{Declaration, NetworkTest, TestContext};
use crate::device::Device;
use crate::policy::{Policy, PolicyContext, PolicyDecision};
use crate::runner::Engine;

pub struct TestInstance<T: NetworkTest> {
    definition: Arc<T>,
    inputs: Option<TestInputs<T::Input>>,
    commands: Vec<Command>,
    result: TestResult,
    policies: Vec<Arc<dyn Policy>>,
}

impl<T: NetworkTest> TestInstance<T> {
    /// Build an instance. Failures leave the result at `error`.
    pub fn new(
        definition: Arc<T>,
        device: &dyn Device,
        raw_inputs: Value,
        outputs: Option<Vec<CommandOutput>>,
    ) -> Self {
        let categories = definition
            .categories()
            .iter()
            .map(|c| (*c).to_string())
            .collect();
        let result = TestResult::new(
            device.name(),
            definition.name(),
            categories,
            definition.description(),
        );
        let policies = definition.policies();

        let mut instance = Self {
            definition,
            inputs: None,
            commands: Vec::new(),
            result,
            policies,
        };

        let ctx = PolicyContext {
            test: instance.definition.name(),
            device: device.name(),
            hardware_model: device.hardware_model(),
        };
        for policy in &instance.policies {
            policy.on_construct(&ctx);
        }

        if let Err(err) = instance.initialize(raw_inputs, outputs) {
            instance.record(err);
        }
        instance
    }

    fn initialize(
        &mut self,
        raw_inputs: Value,
        outputs: Option<Vec<CommandOutput>>,
    ) -> Result<(), ExecutionError> {
        let inputs = TestInputs::<T::Input>::from_value(raw_inputs)?;
        if let Some(overwrite) = &inputs.result_overwrite {
            self.result.apply_overwrite(overwrite);
        }

        let mut commands = Vec::new();
        for declaration in self.definition.commands() {
            match declaration {
                Declaration::Command(command) => commands.push(command.clone()),
                Declaration::Template(template) => {
                    let definition = &self.definition;
                    let input = &inputs.input;
                    let rendered = catch_unwind(AssertUnwindSafe(|| {
                        definition.render(input, template)
                    }))
                    .unwrap_or_else(|payload| {
                        Err(RenderError::Hook {
                            test: definition.name().to_string(),
                            template: template.text().to_string(),
                            message: panic_message(payload.as_ref()),
                        })
                    })?;
                    commands.extend(rendered);
                }
            }
        }
        debug!(
            test = %self.definition.name(),
            device = %self.result.device,
            commands = commands.len(),
            "Expanded test commands"
        );

        self.commands = commands;
        self.inputs = Some(inputs);
        if let Some(outputs) = outputs {
            self.copy_outputs(outputs)?;
        }
        Ok(())
    }

    fn copy_outputs(&mut self, outputs: Vec<CommandOutput>) -> Result<(), ExecutionError> {
        if outputs.len() != self.commands.len() {
            return Err(ExecutionError::InitializationCountMismatch {
                supplied: outputs.len(),
                expected: self.commands.len(),
            });
        }
        for (command, output) in self.commands.iter_mut().zip(outputs) {
            command.set_output(output);
        }
        Ok(())
    }

    /// Write `err` onto the result and log it.
    fn record(&mut self, err: ExecutionError) {
        let message = sanitize_message(&err.to_string());
        let code = err.code().code_string();
        match err.status() {
            TestStatus::Skipped => {
                warn!(test = %self.result.test, device = %self.result.device, code = %code, "{message}");
                self.result.set_skipped(message);
            }
            TestStatus::Unset => {
                warn!(test = %self.result.test, device = %self.result.device, code = %code, "{message}");
            }
            _ => {
                error!(test = %self.result.test, device = %self.result.device, code = %code, "{message}");
                self.result.set_error(message);
            }
        }
    }

    pub fn definition(&self) -> &Arc<T> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Validated inputs, absent when validation failed.
    pub fn inputs(&self) -> Option<&TestInputs<T::Input>> {
        self.inputs.as_ref()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn result(&self) -> &TestResult {
        &self.result
    }

    pub fn into_result(self) -> TestResult {
        self.result
    }

    /// Run verification. A second call returns the existing result.
    ///
    /// `outputs`, when given, replace collection for this call and follow
    /// the same count rule as outputs given at construction.
    pub async fn run(
        &mut self,
        engine: &Engine,
        device: &dyn Device,
        outputs: Option<Vec<CommandOutput>>,
    ) -> &TestResult {
        if !self.result.is_unset() {
            return &self.result;
        }

        let ctx = PolicyContext {
            test: self.definition.name(),
            device: device.name(),
            hardware_model: device.hardware_model(),
        };
        let skip = self
            .policies
            .iter()
            .find_map(|policy| match policy.before_verify(&ctx) {
                PolicyDecision::Skip(message) => Some(message),
                PolicyDecision::Continue => None,
            });
        if let Some(message) = skip {
            self.result.set_skipped(message);
            return &self.result;
        }

        if let Some(outputs) = outputs
            && let Err(err) = self.copy_outputs(outputs)
        {
            self.record(err);
            return &self.result;
        }

        if let Some(blocked) = engine.block_list().check(&self.commands) {
            self.record(ExecutionError::SafetyBlocked {
                command: mask_sensitive_command(&blocked.command),
                pattern: blocked.pattern,
            });
            return &self.result;
        }

        if !self.commands.iter().all(Command::is_collected) {
            let correlation_id = engine.correlation_id(self.definition.name());
            debug!(
                test = %self.result.test,
                device = %self.result.device,
                correlation_id = %correlation_id,
                commands = self.commands.len(),
                "Collecting command outputs"
            );
            if let Err(err) = device.collect(&mut self.commands, &correlation_id).await {
                warn!(
                    test = %self.result.test,
                    device = %self.result.device,
                    code = %err.code().code_string(),
                    "Device collection failed"
                );
                self.record(ExecutionError::Collection(err.to_string()));
                return &self.result;
            }
        }

        if self.classify_errors(device.hardware_model()) {
            return &self.result;
        }

        self.verify(device.hardware_model());
        if self.result.is_unset() {
            self.record(ExecutionError::UnsetResult {
                test: self.definition.name().to_string(),
            });
        } else {
            info!(
                test = %self.result.test,
                device = %self.result.device,
                status = %self.result.status(),
                "Test finished"
            );
        }
        &self.result
    }

    /// Resolve erred commands into `skipped` or `error`. Returns true when
    /// any command erred.
    fn classify_errors(&mut self, hardware_model: &str) -> bool {
        let erred: Vec<ExecutionError> = {
            let erred: Vec<&Command> = self.commands.iter().filter(|c| c.is_erred()).collect();
            if erred.is_empty() {
                return false;
            }
            let all_unsupported = erred.iter().all(|c| !c.supported());
            erred
                .into_iter()
                .map(|c| {
                    let command = mask_sensitive_command(c.command());
                    if all_unsupported {
                        ExecutionError::UnsupportedCommand {
                            command,
                            platform: hardware_model.to_string(),
                        }
                    } else {
                        ExecutionError::CommandFailed {
                            command,
                            errors: c.error_summary(),
                        }
                    }
                })
                .collect()
        };
        for err in erred {
            self.record(err);
        }
        true
    }

    fn verify(&mut self, hardware_model: &str) {
        let Some(inputs) = &self.inputs else {
            return;
        };
        let definition = &self.definition;
        let mut ctx = TestContext {
            inputs: &inputs.input,
            commands: &self.commands,
            result: &mut self.result,
            hardware_model,
        };

        let failure = match catch_unwind(AssertUnwindSafe(|| definition.test(&mut ctx))) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(format!("Check raised an error: {err:#}")),
            Err(payload) => Some(format!("Check panicked: {}", panic_message(payload.as_ref()))),
        };
        if let Some(message) = failure {
            self.record(ExecutionError::Verification(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_device::MockDevice;
    use crate::policy::PlatformSkip;
    use netvet_common::{EngineConfig, NoInput, Template};
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct VersionInput {
        #[serde(default = "default_version")]
        version: String,
    }

    fn default_version() -> String {
        "4.30".to_string()
    }

    struct VerifyVersion {
        commands: Vec<Declaration>,
        checks: AtomicUsize,
        policies: Vec<Arc<dyn Policy>>,
    }

    impl VerifyVersion {
        fn new() -> Arc<Self> {
            Self::with_policies(Vec::new())
        }

        fn with_policies(policies: Vec<Arc<dyn Policy>>) -> Arc<Self> {
            Arc::new(Self {
                commands: vec![Command::new("show version").into()],
                checks: AtomicUsize::new(0),
                policies,
            })
        }
    }

    impl NetworkTest for VerifyVersion {
        type Input = VersionInput;

        fn name(&self) -> &str {
            "VerifyVersion"
        }

        fn description(&self) -> &str {
            "Verifies the software version"
        }

        fn categories(&self) -> &[&str] {
            &["software"]
        }

        fn commands(&self) -> &[Declaration] {
            &self.commands
        }

        fn policies(&self) -> Vec<Arc<dyn Policy>> {
            self.policies.clone()
        }

        fn test(&self, ctx: &mut TestContext<'_, VersionInput>) -> anyhow::Result<()> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            let version = ctx.json(0)?["version"].as_str().unwrap_or_default().to_string();
            if version == ctx.inputs.version {
                ctx.result.set_success();
            } else {
                ctx.result
                    .set_failure(format!("device is running version {version}"));
            }
            Ok(())
        }
    }

    struct VerifyRoutes {
        commands: Vec<Declaration>,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct RoutesInput {
        vrfs: Vec<String>,
    }

    impl NetworkTest for VerifyRoutes {
        type Input = RoutesInput;

        fn name(&self) -> &str {
            "VerifyRoutes"
        }

        fn description(&self) -> &str {
            "Verifies routing tables"
        }

        fn categories(&self) -> &[&str] {
            &["routing"]
        }

        fn commands(&self) -> &[Declaration] {
            &self.commands
        }

        fn render(&self, input: &RoutesInput, template: &Template) -> Result<Vec<Command>, RenderError> {
            input
                .vrfs
                .iter()
                .map(|vrf| template.render_from(&json!({ "vrf": vrf })))
                .collect()
        }

        fn test(&self, ctx: &mut TestContext<'_, RoutesInput>) -> anyhow::Result<()> {
            ctx.result.set_success();
            Ok(())
        }
    }

    fn engine() -> Engine {
        Engine::new(&EngineConfig::default()).unwrap()
    }

    fn device() -> MockDevice {
        MockDevice::builder()
            .name("leaf1")
            .output("show version", json!({"version": "4.30"}))
            .build()
    }

    #[tokio::test]
    async fn test_success_path() {
        let device = device();
        let mut instance = TestInstance::new(VerifyVersion::new(), &device, Value::Null, None);
        assert!(instance.result().is_unset());

        let result = instance.run(&engine(), &device, None).await;
        assert_eq!(result.status(), TestStatus::Success);
        assert_eq!(result.device, "leaf1");
        assert_eq!(result.categories, vec!["software".to_string()]);
        assert_eq!(device.call_count(), 1);
        assert!(device.calls()[0].correlation_id.starts_with("netvet-VerifyVersion-"));
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let device = device();
        let definition = VerifyVersion::new();
        let mut instance = TestInstance::new(definition.clone(), &device, json!({"version": "4.31"}), None);
        let engine = engine();

        let first = instance.run(&engine, &device, None).await.clone();
        assert_eq!(first.status(), TestStatus::Failure);
        let second = instance.run(&engine, &device, None).await.clone();
        assert_eq!(first, second);
        assert_eq!(definition.checks.load(Ordering::SeqCst), 1);
        assert_eq!(device.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs_stop_construction() {
        let device = device();
        let mut instance =
            TestInstance::new(VerifyVersion::new(), &device, json!({"versoin": "4.30"}), None);
        assert_eq!(instance.result().status(), TestStatus::Error);
        assert!(instance.result().messages()[0].contains("versoin"));
        assert!(instance.commands().is_empty());
        assert!(instance.inputs().is_none());

        instance.run(&engine(), &device, None).await;
        assert_eq!(device.call_count(), 0);
    }

    #[test]
    fn test_render_hook_expands_templates() {
        let device = device();
        let definition = Arc::new(VerifyRoutes {
            commands: vec![Template::new("show ip route vrf {vrf}").unwrap().into()],
        });
        let instance = TestInstance::new(
            definition,
            &device,
            json!({"vrfs": ["default", "MGMT"]}),
            None,
        );
        let texts: Vec<&str> = instance.commands().iter().map(Command::command).collect();
        assert_eq!(texts, vec!["show ip route vrf default", "show ip route vrf MGMT"]);
        assert!(instance.commands()[0].params().is_some());
    }

    #[test]
    fn test_missing_render_hook_is_error() {
        let device = device();
        let definition = Arc::new(VerifyRoutesNoHook {
            commands: vec![Template::new("show ip route vrf {vrf}").unwrap().into()],
        });
        let instance = TestInstance::new(definition, &device, Value::Null, None);
        assert_eq!(instance.result().status(), TestStatus::Error);
        assert!(instance.result().messages()[0].contains("does not implement render"));
    }

    struct VerifyRoutesNoHook {
        commands: Vec<Declaration>,
    }

    impl NetworkTest for VerifyRoutesNoHook {
        type Input = NoInput;

        fn name(&self) -> &str {
            "VerifyRoutesNoHook"
        }

        fn description(&self) -> &str {
            ""
        }

        fn categories(&self) -> &[&str] {
            &[]
        }

        fn commands(&self) -> &[Declaration] {
            &self.commands
        }

        fn test(&self, _ctx: &mut TestContext<'_, NoInput>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_construction_outputs_bypass_collection() {
        let device = device();
        let mut instance = TestInstance::new(
            VerifyVersion::new(),
            &device,
            Value::Null,
            Some(vec![json!({"version": "4.30"}).into()]),
        );
        instance.run(&engine(), &device, None).await;
        assert_eq!(instance.result().status(), TestStatus::Success);
        assert_eq!(device.call_count(), 0);
    }

    #[tokio::test]
    async fn test_call_time_output_count_mismatch() {
        let device = device();
        let mut instance = TestInstance::new(VerifyVersion::new(), &device, Value::Null, None);
        let outputs: Vec<CommandOutput> = vec![json!({}).into(), json!({}).into()];
        instance.run(&engine(), &device, Some(outputs)).await;
        assert_eq!(instance.result().status(), TestStatus::Error);
        assert!(instance.result().messages()[0].contains("2 output(s) supplied for 1 command(s)"));
        assert_eq!(device.call_count(), 0);
    }

    #[tokio::test]
    async fn test_platform_skip_runs_before_safety_and_collection() {
        let device = device();
        let skip: Arc<dyn Policy> = Arc::new(PlatformSkip::new(["vEOS-lab"]));
        let definition = VerifyVersion::with_policies(vec![skip]);
        let mut instance = TestInstance::new(definition.clone(), &device, Value::Null, None);
        instance.run(&engine(), &device, None).await;

        assert_eq!(instance.result().status(), TestStatus::Skipped);
        assert_eq!(
            instance.result().messages(),
            ["VerifyVersion test is not supported on vEOS-lab.".to_string()]
        );
        assert_eq!(device.call_count(), 0);
        assert_eq!(definition.checks.load(Ordering::SeqCst), 0);
    }

    #[derive(Debug, Clone, Copy)]
    enum RenderMode {
        MissingParameter,
        Panic,
    }

    struct VerifyRenderHooks {
        commands: Vec<Declaration>,
        mode: RenderMode,
        renders: AtomicUsize,
    }

    impl VerifyRenderHooks {
        fn new(mode: RenderMode) -> Arc<Self> {
            Arc::new(Self {
                commands: vec![
                    Template::new("show ip route vrf {vrf}").unwrap().into(),
                    Template::new("show ip bgp summary vrf {vrf}").unwrap().into(),
                ],
                mode,
                renders: AtomicUsize::new(0),
            })
        }
    }

    impl NetworkTest for VerifyRenderHooks {
        type Input = NoInput;

        fn name(&self) -> &str {
            "VerifyRenderHooks"
        }

        fn description(&self) -> &str {
            "Render hook failures"
        }

        fn categories(&self) -> &[&str] {
            &["routing"]
        }

        fn commands(&self) -> &[Declaration] {
            &self.commands
        }

        fn render(&self, _input: &NoInput, template: &Template) -> Result<Vec<Command>, RenderError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                RenderMode::MissingParameter => Ok(vec![template.render(&serde_json::Map::new())?]),
                RenderMode::Panic => panic!("vrf table unavailable"),
            }
        }

        fn test(&self, ctx: &mut TestContext<'_, NoInput>) -> anyhow::Result<()> {
            ctx.result.set_success();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_render_error_stops_expansion() {
        let device = device();
        let definition = VerifyRenderHooks::new(RenderMode::MissingParameter);
        let mut instance = TestInstance::new(definition.clone(), &device, Value::Null, None);

        assert_eq!(instance.result().status(), TestStatus::Error);
        let message = &instance.result().messages()[0];
        assert!(message.starts_with("Test initialization error: cannot render template"));
        assert!(message.contains("missing parameter(s): vrf"));
        assert_eq!(definition.renders.load(Ordering::SeqCst), 1);
        assert!(instance.commands().is_empty());

        instance.run(&engine(), &device, None).await;
        assert_eq!(instance.result().messages().len(), 1);
        assert_eq!(device.call_count(), 0);
    }

    #[tokio::test]
    async fn test_render_panic_is_error() {
        let device = device();
        let definition = VerifyRenderHooks::new(RenderMode::Panic);
        let mut instance = TestInstance::new(definition.clone(), &device, Value::Null, None);

        assert_eq!(instance.result().status(), TestStatus::Error);
        assert_eq!(
            instance.result().messages(),
            ["Test initialization error: VerifyRenderHooks failed to render template \
              'show ip route vrf {vrf}': vrf table unavailable"
                .to_string()]
        );
        assert_eq!(definition.renders.load(Ordering::SeqCst), 1);

        instance.run(&engine(), &device, None).await;
        assert_eq!(instance.result().status(), TestStatus::Error);
        assert_eq!(device.call_count(), 0);
    }

    #[tokio::test]
    async fn test_construction_output_count_mismatch() {
        let device = device();
        let outputs: Vec<CommandOutput> = vec![json!({"version": "4.30"}).into(), json!({}).into()];
        let mut instance = TestInstance::new(VerifyVersion::new(), &device, Value::Null, Some(outputs));

        assert_eq!(instance.result().status(), TestStatus::Error);
        assert_eq!(
            instance.result().messages(),
            ["Test initialization error: 2 output(s) supplied for 1 command(s)".to_string()]
        );
        assert!(!instance.commands()[0].is_collected());

        instance.run(&engine(), &device, None).await;
        assert_eq!(instance.result().messages().len(), 1);
        assert_eq!(device.call_count(), 0);
    }
}
