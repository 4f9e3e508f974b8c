//! Parameterized command templates.
//!
//! A template is parsed once when it is built. The placeholders found in its
//! text become the fields of its [`ParameterSchema`]; rendering substitutes
//! values for those placeholders and yields a fresh [`Command`].
//!
//! Placeholders use `{name}` syntax. `{{` and `}}` produce literal braces.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::command::Command;
use crate::params::{ParamError, ParameterSchema};
use crate::types::{ApiVersion, InvalidRevision, OutputFormat, Revision};

/// Errors raised while building a [`Template`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("malformed template '{template}' at byte {position}: {reason}")]
    Malformed {
        template: String,
        position: usize,
        reason: String,
    },

    #[error(transparent)]
    InvalidRevision(#[from] InvalidRevision),
}

/// Errors raised while turning a template into concrete commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Supplied parameters do not match the placeholders.
    #[error("cannot render template {0}")]
    Parameters(#[from] ParamError),

    /// A value exists but cannot be written into the command text.
    #[error("cannot render template '{template}': parameter '{name}' {reason}")]
    Unresolvable {
        template: String,
        name: String,
        reason: String,
    },

    /// The test declares templates but provides no render hook.
    #[error("{test} declares template '{template}' but does not implement render")]
    NotImplemented { test: String, template: String },

    /// The render hook itself failed.
    #[error("{test} failed to render template '{template}': {message}")]
    Hook {
        test: String,
        template: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug)]
struct TemplateInner {
    text: String,
    segments: Vec<Segment>,
    version: ApiVersion,
    revision: Option<Revision>,
    format: OutputFormat,
    use_cache: bool,
    schema: ParameterSchema,
}

/// An immutable, shareable command template.
///
/// Cloning is cheap; clones share the parsed representation.
#[derive(Debug, Clone)]
pub struct Template {
    inner: Arc<TemplateInner>,
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.text == other.inner.text
                && self.inner.version == other.inner.version
                && self.inner.revision == other.inner.revision
                && self.inner.format == other.inner.format
                && self.inner.use_cache == other.inner.use_cache)
    }
}

impl Template {
    /// Parse a template with default settings (latest version, JSON, cached).
    pub fn new(text: impl Into<String>) -> Result<Self, TemplateError> {
        Self::builder(text).build()
    }

    pub fn builder(text: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            text: text.into(),
            version: ApiVersion::Latest,
            revision: None,
            format: OutputFormat::Json,
            use_cache: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.inner.text
    }

    pub fn version(&self) -> ApiVersion {
        self.inner.version
    }

    pub fn revision(&self) -> Option<Revision> {
        self.inner.revision
    }

    pub fn format(&self) -> OutputFormat {
        self.inner.format
    }

    pub fn use_cache(&self) -> bool {
        self.inner.use_cache
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.inner.schema
    }

    /// Placeholder names in first-appearance order.
    pub fn variables(&self) -> &[String] {
        self.inner.schema.fields()
    }

    /// Render the template into a new command.
    ///
    /// The key set of `params` must equal [`Template::variables`].
    pub fn render(&self, params: &Map<String, Value>) -> Result<Command, RenderError> {
        let parameters = self.inner.schema.instantiate(params)?;

        let mut rendered = String::with_capacity(self.inner.text.len());
        for segment in &self.inner.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder(name) => {
                    let value = parameters.get(name).ok_or_else(|| RenderError::Unresolvable {
                        template: self.inner.text.clone(),
                        name: name.clone(),
                        reason: "has no value".to_string(),
                    })?;
                    rendered.push_str(&self.stringify(name, value)?);
                }
            }
        }

        Ok(Command::from_template(rendered, self.clone(), parameters))
    }

    /// Render from any serializable parameter struct or map.
    pub fn render_from<P: serde::Serialize>(&self, params: &P) -> Result<Command, RenderError> {
        match serde_json::to_value(params) {
            Ok(Value::Object(map)) => self.render(&map),
            Ok(other) => Err(RenderError::Unresolvable {
                template: self.inner.text.clone(),
                name: "<root>".to_string(),
                reason: format!("parameters must be an object, got {}", json_kind(&other)),
            }),
            Err(err) => Err(RenderError::Unresolvable {
                template: self.inner.text.clone(),
                name: "<root>".to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn stringify(&self, name: &str, value: &Value) -> Result<String, RenderError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Err(RenderError::Unresolvable {
                template: self.inner.text.clone(),
                name: name.to_string(),
                reason: "is null".to_string(),
            }),
            other => Ok(other.to_string()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Builder for [`Template`].
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    text: String,
    version: ApiVersion,
    revision: Option<u32>,
    format: OutputFormat,
    use_cache: bool,
}

impl TemplateBuilder {
    pub fn version(mut self, version: ApiVersion) -> Self {
        self.version = version;
        self
    }

    /// Pin a model revision (1..=99). Checked in [`TemplateBuilder::build`].
    pub fn revision(mut self, revision: u32) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn build(self) -> Result<Template, TemplateError> {
        let revision = self.revision.map(Revision::new).transpose()?;
        let segments = parse_segments(&self.text)?;
        let names = segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.clone()),
            Segment::Literal(_) => None,
        });
        let schema = ParameterSchema::new(self.text.clone(), names);

        Ok(Template {
            inner: Arc::new(TemplateInner {
                text: self.text,
                segments,
                version: self.version,
                revision,
                format: self.format,
                use_cache: self.use_cache,
                schema,
            }),
        })
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn parse_segments(text: &str) -> Result<Vec<Segment>, TemplateError> {
    let malformed = |position: usize, reason: &str| TemplateError::Malformed {
        template: text.to_string(),
        position,
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (inner_pos, inner) in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(malformed(inner_pos, "nested '{' inside placeholder")),
                        other => name.push(other),
                    }
                }
                if !closed {
                    return Err(malformed(pos, "unclosed placeholder"));
                }
                if !is_valid_name(&name) {
                    return Err(malformed(
                        pos,
                        &format!("invalid placeholder name '{}'", name),
                    ));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(malformed(pos, "single '}' outside placeholder")),
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
