//! Concrete device commands and their collection slots.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::params::Parameters;
use crate::template::Template;
use crate::types::{ApiVersion, CommandOutput, InvalidRevision, OutputFormat, Revision};

/// Substring a device reports when a command is unavailable on its platform.
pub const UNSUPPORTED_MARKER: &str = "not supported on this hardware platform";

/// Errors raised by the typed output accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    #[error("'{command}' has not been collected")]
    Missing { command: String },

    #[error("'{command}' returned {actual} output, expected {expected}")]
    WrongFormat {
        command: String,
        expected: OutputFormat,
        actual: OutputFormat,
    },
}

/// A concrete request sent to a device, plus the slot for its response.
///
/// A command is *collected* when it has a non-empty output and no errors,
/// and *erred* as soon as any error was recorded. Both can never hold at
/// the same time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    command: String,
    version: ApiVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<Revision>,
    format: OutputFormat,
    use_cache: bool,
    #[serde(skip)]
    template: Option<Template>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Parameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<CommandOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl Command {
    /// A JSON command with latest version and caching enabled.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            version: ApiVersion::Latest,
            revision: None,
            format: OutputFormat::Json,
            use_cache: true,
            template: None,
            params: None,
            output: None,
            errors: Vec::new(),
        }
    }

    pub fn builder(command: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            command: Self::new(command),
            revision: None,
        }
    }

    pub(crate) fn from_template(command: String, template: Template, params: Parameters) -> Self {
        Self {
            command,
            version: template.version(),
            revision: template.revision(),
            format: template.format(),
            use_cache: template.use_cache(),
            template: Some(template),
            params: Some(params),
            output: None,
            errors: Vec::new(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// The template this command was rendered from, if any.
    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn params(&self) -> Option<&Parameters> {
        self.params.as_ref()
    }

    pub fn output(&self) -> Option<&CommandOutput> {
        self.output.as_ref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Stable identity usable as a cache key.
    ///
    /// Hashes the command text, version, revision and output format; two
    /// commands that would produce the same device request share a uid.
    pub fn uid(&self) -> String {
        let revision = self
            .revision
            .map(|r| r.to_string())
            .unwrap_or_else(|| "NA".to_string());
        let material = format!(
            "{}_{}_{}_{}",
            self.command, self.version, revision, self.format
        );
        blake3::hash(material.as_bytes()).to_hex().to_string()
    }

    pub fn set_output(&mut self, output: impl Into<CommandOutput>) {
        self.output = Some(output.into());
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn is_collected(&self) -> bool {
        self.errors.is_empty() && self.output.as_ref().is_some_and(|o| !o.is_empty())
    }

    pub fn is_erred(&self) -> bool {
        !self.errors.is_empty()
    }

    /// False when every recorded error says the platform lacks this command.
    pub fn supported(&self) -> bool {
        self.errors.is_empty() || !self.errors.iter().all(|e| e.contains(UNSUPPORTED_MARKER))
    }

    /// Errors joined for human-readable messages.
    pub fn error_summary(&self) -> String {
        self.errors.join(", ")
    }

    pub fn json_output(&self) -> Result<&Value, OutputError> {
        match &self.output {
            Some(CommandOutput::Json(value)) => Ok(value),
            Some(CommandOutput::Text(_)) => Err(OutputError::WrongFormat {
                command: self.command.clone(),
                expected: OutputFormat::Json,
                actual: OutputFormat::Text,
            }),
            None => Err(OutputError::Missing {
                command: self.command.clone(),
            }),
        }
    }

    pub fn text_output(&self) -> Result<&str, OutputError> {
        match &self.output {
            Some(CommandOutput::Text(text)) => Ok(text),
            Some(CommandOutput::Json(_)) => Err(OutputError::WrongFormat {
                command: self.command.clone(),
                expected: OutputFormat::Text,
                actual: OutputFormat::Json,
            }),
            None => Err(OutputError::Missing {
                command: self.command.clone(),
            }),
        }
    }
}

/// Builder for directly declared commands.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: Command,
    revision: Option<u32>,
}

impl CommandBuilder {
    pub fn version(mut self, version: ApiVersion) -> Self {
        self.command.version = version;
        self
    }

    pub fn revision(mut self, revision: u32) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.command.format = format;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.command.use_cache = use_cache;
        self
    }

    pub fn build(mut self) -> Result<Command, InvalidRevision> {
        self.command.revision = self.revision.map(Revision::new).transpose()?;
        Ok(self.command)
    }
}
