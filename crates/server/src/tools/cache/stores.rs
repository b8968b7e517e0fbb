//! cache_stores tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::StoreSummary;

use crate::error::json_result;
use crate::state::AppState;

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    /// Name of the store owned by the configured generation.
    pub current: String,
    /// Every store present, oldest first.
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_stores tool.
pub async fn stores_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let stores = state.registration.db().store_summaries().await?;
    json_result(&CacheStoresOutput { current: state.config.cache_name(), stores })
}
