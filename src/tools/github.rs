//! `github_search`: search GitHub repositories by free-text query.
//!
//! The handler never fails at the transport level: network errors, non-success
//! statuses, and undecodable bodies all come back as `{"error": "..."}` inside
//! the result.

use futures_util::future::BoxFuture;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::util::truncate_text;
use crate::config::SearchConfig;
use crate::protocol::{soft_error, value_kind};
use crate::registry::{ParamType, ParameterSchema, ToolDescriptor, ToolHandler, ToolRegistry};
use crate::{AppError, Result};

/// Registry name of the tool.
pub const TOOL_NAME: &str = "github_search";

/// Longest slice of an error body echoed back to the caller.
const MAX_ERROR_BODY: usize = 200;

/// Descriptor advertised by `tools/list`.
#[must_use]
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        TOOL_NAME,
        "Search GitHub for repositories matching a query.",
        ParameterSchema::new().required("query", ParamType::String, "Search terms"),
    )
}

/// Build the handler from `config` and register it in `registry`.
///
/// # Errors
///
/// Returns `AppError::Config` if the HTTP client cannot be built or the name
/// is already taken.
pub fn register(registry: &mut ToolRegistry, config: &SearchConfig) -> Result<()> {
    registry.register(descriptor(), GithubSearch::from_config(config)?)
}

/// One repository in the search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryHit {
    /// `owner/name`.
    pub name: String,
    /// Browser URL of the repository.
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RepositoryItem>,
}

#[derive(Debug, Deserialize)]
struct RepositoryItem {
    full_name: String,
    html_url: String,
}

/// Handler for [`TOOL_NAME`].
#[derive(Debug, Clone)]
pub struct GithubSearch {
    client: Client,
    api_base: String,
    result_limit: usize,
    token: Option<String>,
}

impl GithubSearch {
    /// Build a search client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            result_limit: config.result_limit,
            token: config.token.clone(),
        })
    }

    /// Query the repository search endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`] on network failure, a non-success status, or
    /// an undecodable response body.
    pub async fn search(&self, query: &str) -> Result<Vec<RepositoryHit>> {
        let per_page = self.result_limit.to_string();
        let url = Url::parse_with_params(
            &format!("{}/search/repositories", self.api_base),
            &[("q", query), ("per_page", per_page.as_str())],
        )
        .map_err(|err| AppError::Http(format!("invalid search url: {err}")))?;

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Http(format!(
                "search api returned {status}: {}",
                truncate_text(body.trim(), MAX_ERROR_BODY)
            )));
        }

        let payload: SearchResponse = response.json().await?;
        let hits: Vec<RepositoryHit> = payload
            .items
            .into_iter()
            .take(self.result_limit)
            .map(|item| RepositoryHit {
                name: item.full_name,
                url: item.html_url,
            })
            .collect();

        debug!(query, hits = hits.len(), "repository search complete");
        Ok(hits)
    }
}

impl ToolHandler for GithubSearch {
    fn invoke(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let query = match arguments.get("query") {
                Some(Value::String(query)) => query.trim(),
                None | Some(Value::Null) => "",
                Some(other) => {
                    return Ok(soft_error(format!(
                        "query must be a string, found {}",
                        value_kind(other)
                    )))
                }
            };
            if query.is_empty() {
                return Ok(soft_error("query must not be empty"));
            }

            match self.search(query).await {
                Ok(hits) => Ok(json!({ "results": hits })),
                Err(err) => {
                    warn!(query, error = %err, "repository search failed");
                    Ok(soft_error(err.to_string()))
                }
            }
        })
    }
}
