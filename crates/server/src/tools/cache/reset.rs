//! cache_reset tool implementation.
//!
//! Unregisters every worker, deletes every store, then installs a fresh
//! worker for the configured generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::json_result;
use crate::state::AppState;

/// Output from the cache_reset tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheResetOutput {
    /// Stores removed.
    pub deleted: Vec<String>,
    /// Version of the worker installed afterwards.
    pub version: String,
}

/// Implementation of the cache_reset tool.
pub async fn reset_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let deleted = state.registration.reset().await?;
    let worker = state.install_current().await?;
    json_result(&CacheResetOutput { deleted, version: worker.generation().version().to_string() })
}
