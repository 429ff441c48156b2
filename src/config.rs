//! Host configuration parsing, validation, and credential loading.
//!
//! Every field has a built-in default, so a host started without `--config`
//! behaves exactly like one started with an empty file.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::protocol::codec::MAX_LINE_BYTES;
use crate::{AppError, Result};

/// Environment variable holding an optional GitHub API token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Upper bound on `search.result_limit`, matching the API's page size cap.
pub const MAX_RESULT_LIMIT: usize = 100;

/// Session loop settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Longest accepted input line in bytes.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Per-call handler deadline; 0 means no deadline.
    #[serde(default)]
    pub handler_timeout_seconds: u64,
}

impl SessionConfig {
    /// Handler deadline, or `None` when disabled.
    #[must_use]
    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_seconds > 0).then(|| Duration::from_secs(self.handler_timeout_seconds))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
            handler_timeout_seconds: 0,
        }
    }
}

/// Repository-search tool settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// Base URL of the GitHub REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Maximum repositories returned per call.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Whole-request timeout.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// API token (populated at runtime from the environment).
    #[serde(skip)]
    pub token: Option<String>,
}

impl SearchConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            result_limit: default_result_limit(),
            user_agent: default_user_agent(),
            request_timeout_seconds: default_request_timeout_seconds(),
            token: None,
        }
    }
}

fn default_max_line_bytes() -> usize {
    MAX_LINE_BYTES
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

fn default_result_limit() -> usize {
    5
}

fn default_user_agent() -> String {
    concat!("stdio-toolhost/", env!("CARGO_PKG_VERSION")).into()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

/// Host configuration parsed from an optional TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct HostConfig {
    /// Session loop settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Repository-search tool settings.
    #[serde(default)]
    pub search: SearchConfig,
}

impl HostConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the optional GitHub token from [`GITHUB_TOKEN_ENV`].
    ///
    /// An unset or blank variable leaves the search tool unauthenticated.
    pub fn load_credentials(&mut self) {
        self.search.token = env::var(GITHUB_TOKEN_ENV)
            .ok()
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty());
        debug!(
            authenticated = self.search.token.is_some(),
            "search credentials loaded"
        );
    }

    fn validate(&self) -> Result<()> {
        if self.session.max_line_bytes == 0 {
            return Err(AppError::Config(
                "session.max_line_bytes must be greater than zero".into(),
            ));
        }

        if self.search.result_limit == 0 || self.search.result_limit > MAX_RESULT_LIMIT {
            return Err(AppError::Config(format!(
                "search.result_limit must be between 1 and {MAX_RESULT_LIMIT}"
            )));
        }

        if self.search.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "search.request_timeout_seconds must be greater than zero".into(),
            ));
        }

        reqwest::Url::parse(&self.search.api_base)
            .map_err(|err| AppError::Config(format!("search.api_base invalid: {err}")))?;

        Ok(())
    }
}
