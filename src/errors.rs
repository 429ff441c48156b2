//! Error types shared across the host.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all host failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Unrecoverable read or write failure on the stdio streams.
    Io(String),
    /// A line could not be decoded into a request.
    Decode(String),
    /// A request carried structurally invalid `params` or tool arguments.
    InvalidParams(String),
    /// No tool with the given name is registered.
    UnknownTool(String),
    /// A tool handler failed while executing.
    Tool(String),
    /// A tool handler exceeded its deadline.
    Timeout(String),
    /// Outbound HTTP request failure.
    Http(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Decode(msg) => write!(f, "decode: {msg}"),
            Self::InvalidParams(msg) => write!(f, "invalid params: {msg}"),
            Self::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            Self::Tool(msg) => write!(f, "tool: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        Self::Tool(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
