//! Cache-store MCP tools.
//!
//! These act on every store in cache storage, not only the current one.

pub mod clear;
pub mod reset;
pub mod stores;

pub use clear::clear_impl;
pub use reset::reset_impl;
pub use stores::stores_impl;
