//! Request dispatcher: routes a decoded [`Request`] by its [`Method`].
//!
//! | Method                         | Response `result`                         |
//! |--------------------------------|-------------------------------------------|
//! | `initialize`                   | `"initialized"`                           |
//! | `tools/list`, `prompts/list`   | `{"tools": [descriptor, ...]}`            |
//! | `tools/call` (known tool)      | handler output                            |
//! | `tools/call` (unknown tool)    | `{"error": "Unknown tool: <name>"}`       |
//! | *(anything else)*              | no response                               |

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info_span, Instrument};

use crate::protocol::{soft_error, Method, Request, Response, ToolCallParams, INITIALIZED_ACK};
use crate::registry::ToolRegistry;
use crate::{AppError, Result};

/// Routes requests against a borrowed, read-only [`ToolRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    registry: &'a ToolRegistry,
    handler_timeout: Option<Duration>,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher with no handler deadline.
    #[must_use]
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self {
            registry,
            handler_timeout: None,
        }
    }

    /// Bound every handler invocation by `timeout`; `None` disables the bound.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Handle one request.
    ///
    /// Returns `Ok(None)` for requests that get no response (unknown or
    /// missing `method`). Any returned response echoes the request `id`.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidParams`] when a `tools/call` carries non-object
    ///   `params` or `arguments`.
    /// - [`AppError::Timeout`] when a handler exceeds its deadline.
    /// - Any error returned by the tool handler itself.
    pub async fn dispatch(&self, request: Request) -> Result<Option<Response>> {
        let method = request.method();
        let Request { id, params, .. } = request;

        match method {
            Method::Initialize => Ok(Some(Response::success(id, json!(INITIALIZED_ACK)))),
            Method::ToolsList | Method::PromptsList => {
                Ok(Some(Response::success(id, self.list_tools())))
            }
            Method::ToolsCall => {
                let params = ToolCallParams::from_params(params)?;
                let result = self.call_tool(params).await?;
                Ok(Some(Response::success(id, result)))
            }
            Method::Unsupported(name) => {
                debug!(
                    method = name.as_deref().unwrap_or("<none>"),
                    %id,
                    "dispatcher: ignoring unsupported method"
                );
                Ok(None)
            }
        }
    }

    fn list_tools(&self) -> Value {
        json!({ "tools": self.registry.list() })
    }

    async fn call_tool(&self, params: ToolCallParams) -> Result<Value> {
        let display_name = params.display_name();
        let handler = match params.tool_name().map(|name| self.registry.lookup(name)) {
            Some(Ok(handler)) => handler,
            Some(Err(AppError::UnknownTool(_))) | None => {
                debug!(tool = %display_name, "dispatcher: unknown tool");
                return Ok(soft_error(format!("Unknown tool: {display_name}")));
            }
            Some(Err(err)) => return Err(err),
        };

        let arguments = params.into_arguments()?;
        let invocation = handler
            .invoke(arguments)
            .instrument(info_span!("tool_call", tool = %display_name));

        match self.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, invocation)
                .await
                .map_err(|_| {
                    AppError::Timeout(format!("tool {display_name} exceeded {limit:?}"))
                })?,
            None => invocation.await,
        }
    }
}
