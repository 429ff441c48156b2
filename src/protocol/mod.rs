//! Wire types for the line-delimited JSON-RPC protocol.
//!
//! Every message is one JSON object on one line. Inbound lines decode into a
//! [`Request`]; everything the host writes is a [`Response`] whose
//! [`Outcome`] carries exactly one of `result` or `error`.
//!
//! | Method          | Maps to                  |
//! |-----------------|--------------------------|
//! | `initialize`    | [`Method::Initialize`]   |
//! | `tools/list`    | [`Method::ToolsList`]    |
//! | `prompts/list`  | [`Method::PromptsList`]  |
//! | `tools/call`    | [`Method::ToolsCall`]    |
//! | *(any other)*   | [`Method::Unsupported`]  |

pub mod codec;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{AppError, Result};

/// Protocol tag carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol version asserted by the startup announcement.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Fixed correlation id of the unsolicited startup announcement.
pub const ANNOUNCEMENT_ID: i64 = 1;

/// Acknowledgment returned as the `result` of `initialize`.
pub const INITIALIZED_ACK: &str = "initialized";

// ── Inbound ──────────────────────────────────────────────────────────────────

/// A decoded inbound message.
///
/// All fields are optional on the wire. An absent `id` is indistinguishable
/// from `"id": null` and is echoed back as `null`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Request {
    /// Protocol tag; accepted but not enforced.
    #[serde(default)]
    pub jsonrpc: Option<Value>,
    /// Correlation id, echoed verbatim in the response.
    #[serde(default)]
    pub id: Value,
    /// Raw method value; see [`Request::method`].
    #[serde(default)]
    pub method: Option<Value>,
    /// Method-specific payload. `None` when absent; an explicit `null` is
    /// kept as `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present_value")]
    pub params: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Request {
    /// Classify the raw `method` field.
    #[must_use]
    pub fn method(&self) -> Method {
        Method::parse(self.method.as_ref())
    }
}

/// The closed set of methods the host understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// Client handshake.
    Initialize,
    /// Capability listing.
    ToolsList,
    /// Capability listing under its alternate name.
    PromptsList,
    /// Tool invocation.
    ToolsCall,
    /// Anything else. `None` when `method` is missing or not a string.
    Unsupported(Option<String>),
}

impl Method {
    /// Map a raw `method` value onto a [`Method`].
    #[must_use]
    pub fn parse(raw: Option<&Value>) -> Self {
        match raw.and_then(Value::as_str) {
            Some("initialize") => Self::Initialize,
            Some("tools/list") => Self::ToolsList,
            Some("prompts/list") => Self::PromptsList,
            Some("tools/call") => Self::ToolsCall,
            Some(other) => Self::Unsupported(Some(other.to_owned())),
            None => Self::Unsupported(None),
        }
    }

    /// Wire name of the method, or `"<none>"` when it was missing.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::ToolsList => "tools/list",
            Self::PromptsList => "prompts/list",
            Self::ToolsCall => "tools/call",
            Self::Unsupported(Some(name)) => name,
            Self::Unsupported(None) => "<none>",
        }
    }
}

/// `params` of a `tools/call` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallParams {
    /// Requested tool name. Usually a string; kept raw so non-string names
    /// can be reported back verbatim.
    pub name: Value,
    /// Raw `arguments` value, `None` when absent.
    pub arguments: Option<Value>,
}

impl ToolCallParams {
    /// Extract `name` and `arguments` from a request's `params`.
    ///
    /// Missing `params` behaves like an empty object; `"params": null` does
    /// not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidParams`] when `params` is present but is not
    /// a JSON object.
    pub fn from_params(params: Option<Value>) -> Result<Self> {
        let mut params = match params {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(AppError::InvalidParams(format!(
                    "params must be an object, found {}",
                    value_kind(&other)
                )))
            }
        };

        Ok(Self {
            name: params.remove("name").unwrap_or(Value::Null),
            arguments: params.remove("arguments"),
        })
    }

    /// Tool name when it is a string.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        self.name.as_str()
    }

    /// Human-readable tool name: the string itself, or its JSON text.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.name {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        }
    }

    /// Take the argument mapping handed to the tool handler.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidParams`] when `arguments` is present but is
    /// not a JSON object.
    pub fn into_arguments(self) -> Result<Map<String, Value>> {
        match self.arguments {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(AppError::InvalidParams(format!(
                "arguments must be an object, found {}",
                value_kind(&other)
            ))),
        }
    }
}

// ── Outbound ─────────────────────────────────────────────────────────────────

/// Error payload of a transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    /// Description of the failure. Never empty.
    pub message: String,
}

/// The single payload of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Success payload, serialized as `result`.
    Result(Value),
    /// Failure payload, serialized as `error`.
    Error(ErrorObject),
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: &'static str,
    /// Correlation id of the request this answers.
    pub id: Value,
    /// `result` or `error`, flattened into the envelope.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// A success response correlated with `id`.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Result(result),
        }
    }

    /// A transport-level failure with `id = null`.
    #[must_use]
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Value::Null,
            outcome: Outcome::Error(ErrorObject {
                message: message.into(),
            }),
        }
    }

    /// The unsolicited startup announcement.
    #[must_use]
    pub fn announcement() -> Self {
        Self::success(
            Value::from(ANNOUNCEMENT_ID),
            json!({ "protocolVersion": PROTOCOL_VERSION }),
        )
    }

    /// `result` payload, if this is a success response.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }
}

/// Application-level failure payload, carried inside a successful `result`.
#[must_use]
pub fn soft_error(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

/// Short name of a JSON value's type, for error messages.
#[must_use]
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
