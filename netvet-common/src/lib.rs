//! Shared model for the netvet validation engine.
//!
//! Commands, templates, results and the input envelope live here together
//! with the ambient pieces every netvet crate uses: the error catalog,
//! configuration, logging bootstrap and test logging helpers.

pub mod api;
pub mod catalog;
pub mod command;
pub mod config;
pub mod errors;
pub mod inputs;
pub mod logging;
pub mod params;
pub mod result;
pub mod template;
pub mod testing;
pub mod types;
pub mod util;

pub use catalog::{CatalogEntry, parse_catalog};
pub use command::{Command, CommandBuilder, OutputError, UNSUPPORTED_MARKER};
pub use config::{
    ConfigError, ConfigSource, ConfigWarning, EngineConfig, LoadedConfig, load_config,
    validate_config,
};
pub use errors::{ErrorCategory, ErrorCode, ErrorEntry, ExecutionError};
pub use inputs::{Filters, InputError, NoInput, ResultOverwrite, TestInputs};
pub use logging::{LogConfig, LogFormat, LoggingError, LoggingGuards, init_logging};
pub use params::{ParamError, ParameterSchema, Parameters};
pub use result::{TestResult, TestStatus};
pub use template::{RenderError, Template, TemplateBuilder, TemplateError};
pub use types::{ApiVersion, CommandOutput, InvalidRevision, OutputFormat, Revision};
pub use util::{mask_sensitive_command, sanitize_message};
