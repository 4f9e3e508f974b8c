//! Scripted in-memory device for deterministic tests.
//!
//! Responses are keyed by rendered command text. Every `collect` call is
//! recorded with its correlation id so tests can assert that collection
//! happened (or did not).

use async_trait::async_trait;
use netvet_common::{Command, CommandOutput, UNSUPPORTED_MARKER};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use crate::device::{Device, DeviceError};

/// What the mock answers for one command.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    Output(CommandOutput),
    Errors(Vec<String>),
}

/// One recorded `collect` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectCall {
    pub correlation_id: String,
    pub commands: Vec<String>,
    pub uids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockDevice {
    name: String,
    hardware_model: String,
    tags: BTreeSet<String>,
    responses: HashMap<String, MockResponse>,
    transport_failure: Option<String>,
    calls: Arc<Mutex<Vec<CollectCall>>>,
}

impl MockDevice {
    pub fn builder() -> MockDeviceBuilder {
        MockDeviceBuilder::default()
    }

    /// Snapshot of every collect call received so far.
    pub fn calls(&self) -> Vec<CollectCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn respond(&self, command: &mut Command) {
        match self.responses.get(command.command()) {
            Some(MockResponse::Output(output)) => command.set_output(output.clone()),
            Some(MockResponse::Errors(errors)) => {
                for error in errors {
                    command.add_error(error.clone());
                }
            }
            None => command.add_error(format!(
                "Invalid input: no scripted response for '{}'",
                command.command()
            )),
        }
    }
}

#[async_trait]
impl Device for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn hardware_model(&self) -> &str {
        &self.hardware_model
    }

    fn tags(&self) -> BTreeSet<String> {
        self.tags.clone()
    }

    async fn collect(
        &self,
        commands: &mut [Command],
        correlation_id: &str,
    ) -> Result<(), DeviceError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CollectCall {
                correlation_id: correlation_id.to_string(),
                commands: commands.iter().map(|c| c.command().to_string()).collect(),
                uids: commands.iter().map(Command::uid).collect(),
            });

        if let Some(message) = &self.transport_failure {
            return Err(DeviceError::Transport {
                device: self.name.clone(),
                message: message.clone(),
            });
        }

        for command in commands.iter_mut().filter(|c| !c.is_collected()) {
            self.respond(command);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MockDeviceBuilder {
    name: String,
    hardware_model: String,
    tags: BTreeSet<String>,
    responses: HashMap<String, MockResponse>,
    transport_failure: Option<String>,
}

impl Default for MockDeviceBuilder {
    fn default() -> Self {
        Self {
            name: "mock-device".to_string(),
            hardware_model: "vEOS-lab".to_string(),
            tags: BTreeSet::new(),
            responses: HashMap::new(),
            transport_failure: None,
        }
    }
}

impl MockDeviceBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn hardware_model(mut self, model: impl Into<String>) -> Self {
        self.hardware_model = model.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Answer `command` with `output`.
    pub fn output(mut self, command: impl Into<String>, output: impl Into<CommandOutput>) -> Self {
        self.responses
            .insert(command.into(), MockResponse::Output(output.into()));
        self
    }

    /// Answer `command` with device-reported errors.
    pub fn errors<I, S>(mut self, command: impl Into<String>, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let errors = errors.into_iter().map(Into::into).collect();
        self.responses
            .insert(command.into(), MockResponse::Errors(errors));
        self
    }

    /// Report `command` as unavailable on this platform.
    pub fn unsupported(self, command: impl Into<String>) -> Self {
        let error = format!("Command is {UNSUPPORTED_MARKER}");
        self.errors(command, [error])
    }

    /// Fail every collect call at the transport level.
    pub fn fail_collection(mut self, message: impl Into<String>) -> Self {
        self.transport_failure = Some(message.into());
        self
    }

    pub fn build(self) -> MockDevice {
        MockDevice {
            name: self.name,
            hardware_model: self.hardware_model,
            tags: self.tags,
            responses: self.responses,
            transport_failure: self.transport_failure,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}
