//! SQLite-backed named cache stores.
//!
//! Mirrors the browser cache-storage model: a set of named stores, each a
//! key→response mapping keyed by request identity. Access is async via
//! tokio-rusqlite. It supports:
//!
//! - Store enumeration, lazy creation and deletion (cascading to entries)
//! - Request-identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
#[cfg(any(test, feature = "test-util"))]
pub mod faults;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredResponse;
pub use stores::StoreSummary;
