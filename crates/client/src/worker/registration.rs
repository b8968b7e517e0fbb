//! Hosting runtime for one scope: installs, activates and dispatches to
//! workers.

use std::sync::Arc;

use swcache_core::{CacheDb, Error};
use tokio::sync::{RwLock, oneshot};

use super::{ActivationReport, ClientId, Clients, ControlMessage, Generation, MessageReply, ServiceWorker};
use crate::fetch::{FetchMode, Network};
use crate::policy::NoCachePaths;
use crate::request::{Request, Response};

#[derive(Default)]
struct Slots {
    active: Option<Arc<ServiceWorker>>,
    waiting: Option<Arc<ServiceWorker>>,
}

/// Registration of the worker for one scope.
///
/// Owns the handles shared by every generation of the worker: cache
/// storage, network and the client registry.
pub struct Registration {
    db: CacheDb,
    network: Arc<dyn Network>,
    clients: Clients,
    slots: RwLock<Slots>,
}

impl Registration {
    pub fn new(db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { db, network, clients: Clients::new(), slots: RwLock::new(Slots::default()) }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    /// Build a worker wired to this registration's shared handles.
    pub fn worker(&self, generation: Generation, no_cache: NoCachePaths) -> ServiceWorker {
        ServiceWorker::new(self.db.clone(), self.network.clone(), self.clients.clone(), generation, no_cache)
    }

    /// Install a worker and activate it when allowed.
    ///
    /// Registering the generation that is already active is a no-op. A
    /// worker that skipped waiting, or that finds no controlled clients,
    /// is activated at once; otherwise it waits for
    /// [`Registration::activate_waiting`].
    pub async fn register(&self, worker: ServiceWorker) -> Result<Arc<ServiceWorker>, Error> {
        if let Some(active) = self.controller().await
            && active.generation() == worker.generation()
        {
            tracing::debug!(version = worker.generation().version(), "worker unchanged; keeping active instance");
            return Ok(active);
        }

        let worker = Arc::new(worker);
        if let Err(e) = worker.on_install().await {
            worker.make_redundant().await;
            return Err(e);
        }

        let immediate = worker.skips_waiting() || self.clients.controlled_count().await == 0;
        if immediate {
            self.promote(worker.clone()).await?;
        } else {
            let mut slots = self.slots.write().await;
            if let Some(previous) = slots.waiting.replace(worker.clone()) {
                previous.make_redundant().await;
            }
            tracing::info!(version = worker.generation().version(), "worker installed and waiting");
        }

        Ok(worker)
    }

    /// Activate the waiting worker, if there is one.
    pub async fn activate_waiting(&self) -> Result<Option<ActivationReport>, Error> {
        let waiting = self.slots.write().await.waiting.take();
        match waiting {
            Some(worker) => self.promote(worker).await.map(Some),
            None => Ok(None),
        }
    }

    /// Run activation and swap the active worker.
    ///
    /// The slot lock is held for the whole activation, so requests wait for
    /// the new controller instead of reaching a half-activated one.
    async fn promote(&self, worker: Arc<ServiceWorker>) -> Result<ActivationReport, Error> {
        let mut slots = self.slots.write().await;
        if slots.waiting.as_ref().is_some_and(|w| Arc::ptr_eq(w, &worker)) {
            slots.waiting = None;
        }

        let report = match worker.on_activate().await {
            Ok(report) => report,
            Err(e) => {
                worker.make_redundant().await;
                return Err(e);
            }
        };

        if let Some(previous) = slots.active.replace(worker) {
            previous.make_redundant().await;
        }

        Ok(report)
    }

    /// The active worker, if any.
    pub async fn controller(&self) -> Option<Arc<ServiceWorker>> {
        self.slots.read().await.active.clone()
    }

    /// The installed worker waiting to activate, if any.
    pub async fn waiting(&self) -> Option<Arc<ServiceWorker>> {
        self.slots.read().await.waiting.clone()
    }

    /// Open a page; it is controlled by the active worker if there is one.
    pub async fn open_client(&self) -> ClientId {
        let controller = self.controller().await;
        self.clients.open(controller.as_ref().map(|w| w.cache_name())).await
    }

    /// Dispatch a request through the controller.
    ///
    /// Without a controller the request goes straight to the network, as it
    /// does for an uncontrolled page.
    pub async fn fetch(&self, request: Request) -> Result<Response, Error> {
        match self.controller().await {
            Some(worker) => worker.on_fetch(request).await,
            None => self.network.fetch(&request, FetchMode::Default).await,
        }
    }

    /// Post a control message to the controller and wait for its reply.
    ///
    /// # Errors
    ///
    /// `NoController` if no worker is active; `MessageDropped` if the worker
    /// ignored the message.
    pub async fn post_message(&self, message: ControlMessage) -> Result<MessageReply, Error> {
        let worker = self.controller().await.ok_or(Error::NoController)?;
        let (port, reply) = oneshot::channel();
        worker.on_message(message, port).await;
        reply
            .await
            .map_err(|_| Error::MessageDropped("worker did not reply to the message".to_string()))
    }

    /// Drop every worker. Returns false if nothing was registered.
    pub async fn unregister(&self) -> bool {
        let mut slots = self.slots.write().await;
        let workers: Vec<_> = slots.active.take().into_iter().chain(slots.waiting.take()).collect();
        for worker in &workers {
            worker.make_redundant().await;
        }
        if !workers.is_empty() {
            tracing::info!(count = workers.len(), "service worker unregistered");
        }
        !workers.is_empty()
    }

    /// Unregister, then delete every cache store.
    ///
    /// Returns the names of the stores removed. Deletions run concurrently
    /// and all are attempted; any failure is reported after the rest finish.
    pub async fn reset(&self) -> Result<Vec<String>, Error> {
        self.unregister().await;

        let names = self.db.store_names().await?;
        let deleted = super::purge::delete_stores(&self.db, names).await.into_result()?;

        tracing::info!(deleted = deleted.len(), "cache reset complete");
        Ok(deleted)
    }
}
