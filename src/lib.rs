#![forbid(unsafe_code)]

//! Line-delimited JSON-RPC tool host over stdio.
//!
//! A host process announces itself, then answers `initialize`, `tools/list`,
//! `prompts/list`, and `tools/call` requests, one JSON object per line, until
//! its input closes.

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod host;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod tools;

pub use config::HostConfig;
pub use errors::{AppError, Result};
pub use registry::{ToolDescriptor, ToolHandler, ToolRegistry};
