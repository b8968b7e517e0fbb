//! Control messages from pages to the worker.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// A control message posted by a page.
///
/// Wire form is a JSON object with a `type` field. Only `CLEAR_CACHE` is
/// defined; any other `type` is `Unknown` and ignored by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Delete every cache store, whatever its generation.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,
    #[serde(other)]
    Unknown,
}

/// Reply posted back on the message's port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageReply {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

/// Reply transport supplied with a message.
pub type ReplyPort = oneshot::Sender<MessageReply>;
