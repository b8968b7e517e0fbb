//! The cache interception worker.
//!
//! ### Lifecycle
//! - `on_install`: moves to `Installed` and skips the waiting phase, so the
//!   worker can activate without waiting for open pages to close.
//! - `on_activate`: deletes every store not named for this generation, then
//!   claims every open client. Both steps finish before the worker reports
//!   `Activated`.
//!
//! ### Fetch policy
//! - No-cache paths are network-first with cache-defeating headers; the
//!   current store is consulted only when the network fails.
//! - Everything else is cache-first; a miss is fetched and, if it is a
//!   200 same-origin GET, copied into the current store.
//!
//! ### Failure handling
//! Store failures are logged and treated as misses or no-ops. Network
//! failures are never retried and no synthetic offline response is made.

pub mod clients;
pub mod generation;
pub mod lifecycle;
pub mod message;
mod purge;
pub mod registration;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use swcache_core::{AppConfig, CacheDb, Error};
use tokio::sync::RwLock;

pub use clients::{ClientId, Clients};
pub use generation::Generation;
pub use lifecycle::WorkerState;
pub use message::{ControlMessage, MessageReply, ReplyPort};
pub use registration::Registration;

use crate::fetch::{FetchMode, Network};
use crate::policy::{NoCachePaths, Strategy};
use crate::request::{Request, Response, ResponseSource};

/// Outcome of an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale stores removed, in enumeration order.
    pub deleted: Vec<String>,
    /// Number of open clients now controlled by this worker.
    pub claimed: usize,
}

/// One worker instance, bound to a single cache generation.
pub struct ServiceWorker {
    db: CacheDb,
    network: Arc<dyn Network>,
    clients: Clients,
    generation: Generation,
    no_cache: NoCachePaths,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
}

impl ServiceWorker {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, clients: Clients, generation: Generation, no_cache: NoCachePaths,
    ) -> Self {
        Self {
            db,
            network,
            clients,
            generation,
            no_cache,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
        }
    }

    /// Build a worker for the configured generation and no-cache paths.
    pub fn from_config(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>, clients: Clients) -> Self {
        Self::new(db, network, clients, Generation::from_config(config), NoCachePaths::from_config(config))
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Name of the current store.
    pub fn cache_name(&self) -> &str {
        self.generation.cache_name()
    }

    pub fn no_cache_paths(&self) -> &NoCachePaths {
        &self.no_cache
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Ask to be promoted past the waiting phase.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skips_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    async fn transition(&self, next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !state.can_move_to(next) {
            return Err(Error::InvalidState(format!(
                "worker {} cannot go from {} to {}",
                self.generation.version(),
                *state,
                next
            )));
        }
        tracing::debug!(version = self.generation.version(), from = %*state, to = %next, "worker state change");
        *state = next;
        Ok(())
    }

    /// Mark this worker as superseded. Returns false if it already was.
    pub async fn make_redundant(&self) -> bool {
        let released = self.transition(WorkerState::Redundant).await.is_ok();
        if released {
            self.clients.release(self.cache_name()).await;
        }
        released
    }

    /// Handle the install event.
    pub async fn on_install(&self) -> Result<(), Error> {
        self.transition(WorkerState::Installing).await?;
        tracing::info!(version = self.generation.version(), "installing service worker");
        self.skip_waiting();
        self.transition(WorkerState::Installed).await
    }

    /// Handle the activate event: purge stale stores, then claim clients.
    pub async fn on_activate(&self) -> Result<ActivationReport, Error> {
        self.transition(WorkerState::Activating).await?;
        tracing::info!(version = self.generation.version(), "activating service worker");

        let deleted = self.delete_stale_stores().await;
        let claimed = self.clients.claim(self.cache_name()).await;

        self.transition(WorkerState::Activated).await?;
        tracing::info!(
            version = self.generation.version(),
            deleted = deleted.len(),
            claimed,
            "service worker activated"
        );

        Ok(ActivationReport { deleted, claimed })
    }

    async fn delete_stale_stores(&self) -> Vec<String> {
        let names = match self.db.store_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate cache stores; stale stores kept until next activation");
                return Vec::new();
            }
        };

        let stale: Vec<String> = names.into_iter().filter(|name| !self.generation.owns(name)).collect();
        purge::delete_stores(&self.db, stale).await.deleted
    }

    /// Handle one intercepted request.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the worker is activated; otherwise only network
    /// errors that the policy does not absorb.
    pub async fn on_fetch(&self, request: Request) -> Result<Response, Error> {
        let state = self.state().await;
        if state != WorkerState::Activated {
            return Err(Error::InvalidState(format!("worker is {state}, not intercepting requests")));
        }

        match self.no_cache.strategy_for(request.path()) {
            Strategy::NetworkFirst => self.network_first(&request).await,
            Strategy::CacheFirst => self.cache_first(&request).await,
        }
    }

    async fn network_first(&self, request: &Request) -> Result<Response, Error> {
        tracing::debug!(path = request.path(), "fetching without cache");

        match self.network.fetch(request, FetchMode::NoCache).await {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::error!(path = request.path(), error = %err, "network fetch failed for no-cache path");
                match self.lookup(request, ResponseSource::CacheFallback).await {
                    Some(cached) => Ok(cached),
                    None => Err(err),
                }
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<Response, Error> {
        if let Some(cached) = self.lookup(request, ResponseSource::Cache).await {
            tracing::debug!(path = request.path(), "served from cache");
            return Ok(cached);
        }

        let response = self.network.fetch(request, FetchMode::Default).await?;

        if !request.is_cacheable_method() || !response.is_cacheable() {
            tracing::debug!(
                path = request.path(),
                method = %request.method,
                status = response.status.as_u16(),
                response_type = %response.response_type,
                "response not cacheable"
            );
            return Ok(response);
        }

        let copy = response.to_stored(request);
        if let Err(e) = self.db.put_entry(self.cache_name(), &request.cache_key(), &copy).await {
            tracing::warn!(path = request.path(), store = self.cache_name(), error = %e, "failed to store response");
        }

        Ok(response)
    }

    async fn lookup(&self, request: &Request, source: ResponseSource) -> Option<Response> {
        if !request.is_cacheable_method() {
            return None;
        }

        let stored = match self.db.match_entry(self.cache_name(), &request.cache_key()).await {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::warn!(path = request.path(), error = %e, "cache lookup failed");
                return None;
            }
        };

        match Response::from_stored(stored, source) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(path = request.path(), error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Handle a control message, replying on `port`.
    ///
    /// Returns false when the message was not recognised; the port is then
    /// dropped without a reply.
    pub async fn on_message(&self, message: ControlMessage, port: ReplyPort) -> bool {
        match message {
            ControlMessage::ClearCache => {
                tracing::info!("clear cache request received");
                let reply = match self.clear_all_stores().await {
                    Ok(deleted) => {
                        tracing::info!(deleted = deleted.len(), "all cache stores deleted");
                        MessageReply::ok()
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to clear cache stores");
                        MessageReply::failed(e.to_string())
                    }
                };
                if port.send(reply).is_err() {
                    tracing::warn!("client closed its reply port before the clear completed");
                }
                true
            }
            ControlMessage::Unknown => {
                tracing::debug!("ignoring unrecognized control message");
                false
            }
        }
    }

    /// Delete every store. Every deletion is attempted; fails if enumeration
    /// or any deletion failed.
    async fn clear_all_stores(&self) -> Result<Vec<String>, Error> {
        let names = self.db.store_names().await?;
        purge::delete_stores(&self.db, names).await.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ResponseType;
    use crate::testing::{MockNetwork, get, memory_db};
    use reqwest::{Method, StatusCode};
    use tokio::sync::oneshot;

    async fn activated(db: &CacheDb, network: &Arc<MockNetwork>, version: &str) -> ServiceWorker {
        let worker = ServiceWorker::new(
            db.clone(),
            network.clone(),
            Clients::new(),
            Generation::new("gmao-cache-", version),
            NoCachePaths::default(),
        );
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();
        worker
    }

    #[tokio::test]
    async fn test_install_skips_waiting() {
        let worker = ServiceWorker::new(
            memory_db().await,
            MockNetwork::new(),
            Clients::new(),
            Generation::new("gmao-cache-", "v1"),
            NoCachePaths::default(),
        );
        assert_eq!(worker.state().await, WorkerState::Parsed);
        assert!(!worker.skips_waiting());

        worker.on_install().await.unwrap();
        assert_eq!(worker.state().await, WorkerState::Installed);
        assert!(worker.skips_waiting());
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let worker = ServiceWorker::new(
            memory_db().await,
            MockNetwork::new(),
            Clients::new(),
            Generation::new("gmao-cache-", "v1"),
            NoCachePaths::default(),
        );
        let result = worker.on_activate().await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_fetch_before_activation_rejected() {
        let worker = ServiceWorker::new(
            memory_db().await,
            MockNetwork::new(),
            Clients::new(),
            Generation::new("gmao-cache-", "v1"),
            NoCachePaths::default(),
        );
        worker.on_install().await.unwrap();
        let result = worker.on_fetch(get("/images/logo.png")).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_and_claims() {
        let db = memory_db().await;
        db.open_store("gmao-cache-v1").await.unwrap();
        db.open_store("unrelated-store").await.unwrap();
        db.open_store("gmao-cache-v2").await.unwrap();

        let clients = Clients::new();
        let page = clients.open(Some("gmao-cache-v1")).await;
        let worker = ServiceWorker::new(
            db.clone(),
            MockNetwork::new(),
            clients.clone(),
            Generation::new("gmao-cache-", "v2"),
            NoCachePaths::default(),
        );
        worker.on_install().await.unwrap();
        let report = worker.on_activate().await.unwrap();

        assert_eq!(report.deleted, vec!["gmao-cache-v1".to_string(), "unrelated-store".to_string()]);
        assert_eq!(report.claimed, 1);
        assert_eq!(db.store_names().await.unwrap(), vec!["gmao-cache-v2".to_string()]);
        assert_eq!(clients.controller_of(page).await.as_deref(), Some("gmao-cache-v2"));
        assert_eq!(worker.state().await, WorkerState::Activated);
    }

    async fn claiming_worker(db: &CacheDb, clients: &Clients, version: &str) -> ServiceWorker {
        let worker = ServiceWorker::new(
            db.clone(),
            MockNetwork::new(),
            clients.clone(),
            Generation::new("gmao-cache-", version),
            NoCachePaths::default(),
        );
        worker.on_install().await.unwrap();
        worker
    }

    #[tokio::test]
    async fn test_activate_survives_failed_stale_delete() {
        let db = memory_db().await;
        db.open_store("gmao-cache-v0").await.unwrap();
        db.open_store("gmao-cache-v1").await.unwrap();
        db.fail_deletes_of("gmao-cache-v0").await.unwrap();

        let clients = Clients::new();
        let page = clients.open(Some("gmao-cache-v1")).await;
        let worker = claiming_worker(&db, &clients, "v2").await;
        let report = worker.on_activate().await.unwrap();

        assert_eq!(report.deleted, vec!["gmao-cache-v1".to_string()]);
        assert_eq!(report.claimed, 1);
        assert_eq!(db.store_names().await.unwrap(), vec!["gmao-cache-v0".to_string()]);
        assert_eq!(clients.controller_of(page).await.as_deref(), Some("gmao-cache-v2"));
        assert_eq!(worker.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_survives_failed_enumeration() {
        let db = memory_db().await;
        db.drop_store_tables().await.unwrap();

        let clients = Clients::new();
        clients.open(None).await;
        let worker = claiming_worker(&db, &clients, "v2").await;
        let report = worker.on_activate().await.unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.claimed, 1);
        assert_eq!(worker.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_no_cache_path_goes_to_network_and_leaves_store_alone() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        network.route("/css/main.css", StatusCode::OK, "body{}", ResponseType::Basic);
        let worker = activated(&db, &network, "v1").await;

        let first = worker.on_fetch(get("/css/main.css")).await.unwrap();
        let second = worker.on_fetch(get("/css/main.css")).await.unwrap();

        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(second.source, ResponseSource::Network);
        assert_eq!(network.calls(), 2);
        assert_eq!(network.modes(), vec![FetchMode::NoCache, FetchMode::NoCache]);
        assert!(!db.has_store("gmao-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_no_cache_path_returns_error_status_verbatim() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        network.route("/admin.html", StatusCode::FORBIDDEN, "denied", ResponseType::Basic);
        let worker = activated(&db, &network, "v1").await;

        let response = worker.on_fetch(get("/admin.html")).await.unwrap();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body.as_ref(), b"denied");
    }

    #[tokio::test]
    async fn test_no_cache_path_offline_falls_back_to_cache() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        let worker = activated(&db, &network, "v1").await;

        let request = get("/css/main.css");
        let cached = Response {
            url: request.url.clone(),
            status: StatusCode::OK,
            headers: reqwest::header::HeaderMap::new(),
            body: bytes::Bytes::from_static(b"cached{}"),
            response_type: ResponseType::Basic,
            source: ResponseSource::Network,
        };
        db.put_entry("gmao-cache-v1", &request.cache_key(), &cached.to_stored(&request))
            .await
            .unwrap();

        network.set_online(false);
        let response = worker.on_fetch(get("/css/main.css")).await.unwrap();
        assert_eq!(response.source, ResponseSource::CacheFallback);
        assert_eq!(response.body.as_ref(), b"cached{}");
    }

    #[tokio::test]
    async fn test_no_cache_path_offline_without_copy_fails() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        let worker = activated(&db, &network, "v1").await;

        network.set_online(false);
        let result = worker.on_fetch(get("/css/main.css")).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_cache_first_second_request_skips_network() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        network.route("/images/logo.png", StatusCode::OK, "png", ResponseType::Basic);
        let worker = activated(&db, &network, "v1").await;

        let first = worker.on_fetch(get("/images/logo.png")).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(network.calls(), 1);

        let second = worker.on_fetch(get("/images/logo.png")).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.body.as_ref(), b"png");
        assert_eq!(network.calls(), 1);
        assert_eq!(network.modes(), vec![FetchMode::Default]);
    }

    #[tokio::test]
    async fn test_cache_first_creates_store_lazily() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        network.route("/images/logo.png", StatusCode::OK, "png", ResponseType::Basic);
        let worker = activated(&db, &network, "v2").await;

        assert!(!db.has_store("gmao-cache-v2").await.unwrap());
        worker.on_fetch(get("/images/logo.png")).await.unwrap();
        assert!(db.has_store("gmao-cache-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_non_success_not_stored() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        let worker = activated(&db, &network, "v1").await;

        let response = worker.on_fetch(get("/images/missing.png")).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        worker.on_fetch(get("/images/missing.png")).await.unwrap();
        assert_eq!(network.calls(), 2);
        assert_eq!(db.entry_count("gmao-cache-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_opaque_not_stored() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        network.route("/fonts/roboto.woff2", StatusCode::OK, "font", ResponseType::Opaque);
        network.route("/lib/chart.js", StatusCode::OK, "chart", ResponseType::Cors);
        let worker = activated(&db, &network, "v1").await;

        worker.on_fetch(get("/fonts/roboto.woff2")).await.unwrap();
        worker.on_fetch(get("/lib/chart.js")).await.unwrap();
        assert!(!db.has_store("gmao-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_post_not_stored() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        network.route("/api/actions", StatusCode::OK, "[]", ResponseType::Basic);
        let worker = activated(&db, &network, "v1").await;

        let mut request = get("/api/actions");
        request.method = Method::POST;
        worker.on_fetch(request.clone()).await.unwrap();
        worker.on_fetch(request).await.unwrap();

        assert_eq!(network.calls(), 2);
        assert!(!db.has_store("gmao-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_first_network_failure_propagates() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        let worker = activated(&db, &network, "v1").await;

        network.set_online(false);
        let result = worker.on_fetch(get("/images/logo.png")).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_query_string_ignored_for_path_matching() {
        let db = memory_db().await;
        let network = MockNetwork::new();
        network.route("/actions.html", StatusCode::OK, "<html>", ResponseType::Basic);
        let worker = activated(&db, &network, "v1").await;

        worker.on_fetch(get("/actions.html?nocache=1717")).await.unwrap();
        assert_eq!(network.modes(), vec![FetchMode::NoCache]);
    }

    #[tokio::test]
    async fn test_clear_cache_message() {
        let db = memory_db().await;
        db.open_store("gmao-cache-v0").await.unwrap();
        let network = MockNetwork::new();
        network.route("/images/logo.png", StatusCode::OK, "png", ResponseType::Basic);
        let worker = activated(&db, &network, "v1").await;
        worker.on_fetch(get("/images/logo.png")).await.unwrap();

        let (tx, rx) = oneshot::channel();
        assert!(worker.on_message(ControlMessage::ClearCache, tx).await);

        assert_eq!(rx.await.unwrap(), MessageReply::ok());
        assert!(db.store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache_reports_failed_delete() {
        let db = memory_db().await;
        let worker = activated(&db, &MockNetwork::new(), "c").await;
        for name in ["gmao-cache-a", "gmao-cache-b", "gmao-cache-c"] {
            db.open_store(name).await.unwrap();
        }
        db.fail_deletes_of("gmao-cache-a").await.unwrap();

        let (tx, rx) = oneshot::channel();
        assert!(worker.on_message(ControlMessage::ClearCache, tx).await);

        let reply = rx.await.unwrap();
        assert!(!reply.success);
        assert!(reply.error.unwrap().contains("gmao-cache-a"));
        assert_eq!(db.store_names().await.unwrap(), vec!["gmao-cache-a".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_cache_reports_failed_enumeration() {
        let db = memory_db().await;
        let worker = activated(&db, &MockNetwork::new(), "v1").await;
        db.drop_store_tables().await.unwrap();

        let (tx, rx) = oneshot::channel();
        assert!(worker.on_message(ControlMessage::ClearCache, tx).await);

        let reply = rx.await.unwrap();
        assert!(!reply.success);
        assert!(reply.error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let db = memory_db().await;
        db.open_store("gmao-cache-v1").await.unwrap();
        let worker = activated(&db, &MockNetwork::new(), "v1").await;

        let (tx, rx) = oneshot::channel();
        assert!(!worker.on_message(ControlMessage::Unknown, tx).await);
        assert!(rx.await.is_err());
        assert!(db.has_store("gmao-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_make_redundant_releases_clients() {
        let db = memory_db().await;
        let clients = Clients::new();
        let page = clients.open(None).await;
        let worker = ServiceWorker::new(
            db,
            MockNetwork::new(),
            clients.clone(),
            Generation::new("gmao-cache-", "v1"),
            NoCachePaths::default(),
        );
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();

        assert!(worker.make_redundant().await);
        assert!(!worker.make_redundant().await);
        assert_eq!(clients.controller_of(page).await, None);
        assert!(matches!(worker.on_fetch(get("/images/logo.png")).await, Err(Error::InvalidState(_))));
    }
}
