//! Tool specs, handlers, and the registry.
//!
//! A tool is two halves registered together under one name:
//! - a [`ToolSpec`] the model sees (description, parameters, category,
//!   optional permission)
//! - a [`ToolHandler`] that does the work once arguments are validated
//!
//! The registry keeps registration order; the prompt lists tools in that
//! order so prompts are reproducible.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{AgentError, ToolError};
use crate::permission::Permission;

/// Validated arguments handed to a tool handler.
pub type ToolArgs = serde_json::Map<String, serde_json::Value>;

/// JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// Whether `value` has this type. Integers count as numbers.
    pub fn matches(self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Everything the model needs to know about a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique key in the registry.
    pub name: String,

    pub description: String,

    /// Parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,

    /// Free-form grouping tag (e.g. "time", "math").
    #[serde(default = "default_category")]
    pub category: String,

    /// Capability that must be granted before the handler runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
}

fn default_category() -> String {
    "general".into()
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            category: default_category(),
            permission: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Add a parameter. A later parameter with the same name replaces the
    /// earlier one in place.
    pub fn param(mut self, param: ParamSpec) -> Self {
        match self.parameters.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.parameters.push(param),
        }
        self
    }

    pub fn requires(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }
}

/// The external handler behind a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. `args` has already been checked against the spec.
    async fn call(&self, args: &ToolArgs) -> Result<String, ToolError>;
}

/// Adapter turning a synchronous closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(&ToolArgs) -> Result<String, ToolError> + Send + Sync,
{
    async fn call(&self, args: &ToolArgs) -> Result<String, ToolError> {
        (self.0)(args)
    }
}

/// Wrap a closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(&ToolArgs) -> Result<String, ToolError> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// A spec and its handler, as stored in the registry.
pub struct RegisteredTool {
    spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }
}

/// The set of tools available to the engine.
///
/// Built once, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique; a duplicate is a configuration error.
    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), AgentError> {
        if spec.name.trim().is_empty() {
            return Err(AgentError::InvalidConfiguration(
                "tool name must not be empty".into(),
            ));
        }
        if self.index.contains_key(&spec.name) {
            return Err(AgentError::InvalidConfiguration(format!(
                "tool '{}' is already registered",
                spec.name
            )));
        }
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { spec, handler });
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All specs, in registration order.
    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter().map(|t| &t.spec)
    }

    /// All tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.spec.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
