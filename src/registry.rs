//! Tool registry: the static table of tools a host process exposes.
//!
//! The registry is populated once at startup and then only read. It is built
//! by the binary and passed by reference into the session; there is no
//! process-global instance.

use std::fmt::{Debug, Formatter};

use futures_util::future::BoxFuture;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{AppError, Result};

/// Primitive JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// JSON string.
    String,
    /// Any JSON number.
    Number,
    /// Integral JSON number.
    Integer,
    /// JSON boolean.
    Boolean,
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Field name in the `arguments` object.
    pub name: String,
    /// Expected JSON type.
    pub kind: ParamType,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Whether the caller must supply the field.
    pub required: bool,
}

/// Structural description of the arguments a tool accepts.
///
/// Serializes as a JSON-Schema object:
///
/// ```json
/// { "type": "object", "properties": { "file": { "type": "string" } }, "required": ["file"] }
/// ```
///
/// Properties keep declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    parameters: Vec<Parameter>,
}

impl ParameterSchema {
    /// An empty schema (no parameters).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    #[must_use]
    pub fn required(self, name: &str, kind: ParamType, description: &str) -> Self {
        self.push(name, kind, description, true)
    }

    /// Add an optional parameter.
    #[must_use]
    pub fn optional(self, name: &str, kind: ParamType, description: &str) -> Self {
        self.push(name, kind, description, false)
    }

    /// All parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Names of the required parameters in declaration order.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name.as_str())
    }

    fn push(mut self, name: &str, kind: ParamType, description: &str, required: bool) -> Self {
        self.parameters.push(Parameter {
            name: name.to_owned(),
            kind,
            description: (!description.is_empty()).then(|| description.to_owned()),
            required,
        });
        self
    }
}

impl Serialize for ParameterSchema {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut property = Map::new();
            property.insert("type".into(), serde_json::to_value(param.kind).unwrap_or_default());
            if let Some(description) = &param.description {
                property.insert("description".into(), Value::String(description.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(property));
        }
        let required: Vec<&str> = self.required_names().collect();

        let mut state = serializer.serialize_struct("ParameterSchema", 3)?;
        state.serialize_field("type", "object")?;
        state.serialize_field("properties", &properties)?;
        state.serialize_field("required", &required)?;
        state.end()
    }
}

/// Public description of a tool, as returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    /// Unique registry key.
    pub name: String,
    /// Human-readable summary.
    pub description: String,
    /// Accepted arguments.
    pub parameters: ParameterSchema,
}

impl ToolDescriptor {
    /// Build a descriptor.
    #[must_use]
    pub fn new(name: &str, description: &str, parameters: ParameterSchema) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            parameters,
        }
    }
}

/// A tool implementation.
///
/// Handlers are stateless between calls. `Ok` values become the `result` of
/// the response verbatim, so a handler reports an application-level failure
/// by returning `Ok(soft_error(..))`. `Err` values are transport-level
/// failures and are reported with `id = null`.
pub trait ToolHandler: Send + Sync {
    /// Run the tool with the caller-supplied arguments.
    fn invoke(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<Value>>;
}

/// Adapter turning a synchronous closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

/// Wrap a synchronous closure as a [`ToolHandler`].
#[must_use]
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Result<Value> + Send + Sync,
{
    FnHandler(f)
}

impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Result<Value> + Send + Sync,
{
    fn invoke(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<Value>> {
        let outcome = (self.0)(arguments);
        Box::pin(std::future::ready(outcome))
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Box<dyn ToolHandler>,
}

/// Name → {descriptor, handler} table, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when a tool with the same name is already
    /// registered, or when the name is empty.
    pub fn register<H>(&mut self, descriptor: ToolDescriptor, handler: H) -> Result<()>
    where
        H: ToolHandler + 'static,
    {
        if descriptor.name.is_empty() {
            return Err(AppError::Config("tool name must not be empty".into()));
        }
        if self.contains(&descriptor.name) {
            return Err(AppError::Config(format!(
                "tool {} is already registered",
                descriptor.name
            )));
        }

        self.tools.push(RegisteredTool {
            descriptor,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Descriptors of all registered tools, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(|tool| &tool.descriptor).collect()
    }

    /// Find the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownTool`] when no such tool is registered.
    pub fn lookup(&self, name: &str) -> Result<&dyn ToolHandler> {
        self.tools
            .iter()
            .find(|tool| tool.descriptor.name == name)
            .map(|tool| tool.handler.as_ref())
            .ok_or_else(|| AppError::UnknownTool(name.to_owned()))
    }

    /// Whether a tool named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool.descriptor.name == name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Debug for ToolRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|tool| &tool.descriptor.name))
            .finish()
    }
}
