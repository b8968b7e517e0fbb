//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

pub mod cache;
pub mod sw_fetch;
pub mod worker_status;

pub use sw_fetch::{SwFetchOutput, SwFetchParams};
pub use worker_status::WorkerStatusOutput;
