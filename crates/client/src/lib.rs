//! Client side of swcache.
//!
//! This crate provides the request/response model, the network layer, the
//! no-cache path policy, the cache interception worker with its
//! registration, and the page session that drives cache purges.

pub mod fetch;
pub mod policy;
pub mod request;
pub mod session;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use reqwest::{Method, StatusCode};

pub use fetch::{FetchConfig, FetchMode, HttpNetwork, Network};
pub use policy::{NoCachePaths, Strategy};
pub use request::{Request, Response, ResponseSource, ResponseType};
pub use session::{PageStorage, SessionManager, SessionUser};
pub use worker::{
    ActivationReport, ClientId, Clients, ControlMessage, Generation, MessageReply, Registration, ServiceWorker,
    WorkerState,
};
