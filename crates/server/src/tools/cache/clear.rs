//! cache_clear tool implementation.
//!
//! Posts a `CLEAR_CACHE` control message to the active worker and returns
//! its reply verbatim.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_client::ControlMessage;

use crate::error::json_result;
use crate::state::AppState;

/// Implementation of the cache_clear tool.
pub async fn clear_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let reply = state.registration.post_message(ControlMessage::ClearCache).await?;
    if let Some(error) = &reply.error {
        tracing::warn!(error = %error, "worker failed to clear cache stores");
    }
    json_result(&reply)
}
