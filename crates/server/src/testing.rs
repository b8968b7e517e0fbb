//! Test fixtures for tool handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use swcache_client::{FetchMode, Network, Request, Response, ResponseSource, ResponseType, StatusCode};
use swcache_core::{AppConfig, CacheDb, Error};

use crate::state::AppState;

/// Serves `ok:<path>` with status 200 for every same-origin request.
#[derive(Default)]
pub struct EchoNetwork {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Network for EchoNetwork {
    async fn fetch(&self, request: &Request, _mode: FetchMode) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response {
            url: request.url.clone(),
            status: StatusCode::OK,
            headers: Default::default(),
            body: format!("ok:{}", request.path()).into(),
            response_type: ResponseType::Basic,
            source: ResponseSource::Network,
        })
    }
}

pub async fn test_state() -> AppState {
    test_state_with(Arc::new(EchoNetwork::default())).await
}

pub async fn test_state_with(network: Arc<EchoNetwork>) -> AppState {
    let config = AppConfig { origin: "http://gmao.local:3000".into(), ..Default::default() };
    let db = CacheDb::open_in_memory().await.unwrap();
    AppState::with_parts(config, db, network).await.unwrap()
}

/// Parse the JSON text content of a tool result.
pub fn output<T: serde::de::DeserializeOwned>(result: &rmcp::model::CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
