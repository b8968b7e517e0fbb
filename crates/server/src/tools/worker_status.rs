//! worker_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::json_result;
use crate::state::AppState;

/// Output structure for the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    /// Whether a worker is controlling pages.
    pub active: bool,
    pub version: Option<String>,
    pub cache_name: Option<String>,
    /// Lifecycle state of the active worker.
    pub state: Option<String>,
    /// Version of an installed worker waiting to activate, if any.
    pub waiting: Option<String>,
    pub no_cache_paths: Vec<String>,
    pub clients: usize,
    pub controlled_clients: usize,
}

/// Implementation of the worker_status tool.
pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let registration = &state.registration;
    let controller = registration.controller().await;
    let waiting = registration.waiting().await;

    let mut output = WorkerStatusOutput {
        active: controller.is_some(),
        version: None,
        cache_name: None,
        state: None,
        waiting: waiting.map(|w| w.generation().version().to_string()),
        no_cache_paths: Vec::new(),
        clients: registration.clients().count().await,
        controlled_clients: registration.clients().controlled_count().await,
    };

    if let Some(worker) = controller {
        output.version = Some(worker.generation().version().to_string());
        output.cache_name = Some(worker.cache_name().to_string());
        output.state = Some(worker.state().await.to_string());
        output.no_cache_paths = worker.no_cache_paths().fragments().to_vec();
    }

    json_result(&output)
}
