//! sw_fetch tool implementation.
//!
//! Dispatches a request through the active worker, the way a controlled
//! page would, and reports where the response came from.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{Method, Request, ResponseSource, fetch::resolve};
use swcache_core::Error;

use crate::error::{ToolError, json_result};
use crate::state::AppState;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are ever cached.
    #[serde(default)]
    pub method: Option<String>,
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// URL the response was served from.
    pub final_url: String,
    pub status: u16,
    /// `basic`, `cors` or `opaque`.
    pub response_type: String,
    /// `network`, `cache` or `cache_fallback`.
    pub source: String,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub bytes: usize,
    /// ISO8601 timestamp of the dispatch.
    pub fetched_at: String,
}

fn source_name(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::CacheFallback => "cache_fallback",
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(state: &AppState, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&state.origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = match params.method.as_deref() {
        None => Method::GET,
        Some(raw) => Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| ToolError::InvalidInput(format!("invalid HTTP method: {raw}")))?,
    };

    tracing::debug!(url = %url, method = %method, "sw_fetch");
    let request = Request::new(method, url.clone());
    let response = state.registration.fetch(request).await?;

    let output = SwFetchOutput {
        url: url.to_string(),
        final_url: response.url.to_string(),
        status: response.status.as_u16(),
        response_type: response.response_type.as_str().to_string(),
        source: source_name(response.source).to_string(),
        content_type: response.content_type().map(str::to_string),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        bytes: response.body.len(),
        fetched_at: Utc::now().to_rfc3339(),
    };

    json_result(&output)
}
