//! Shared server state: configuration and the worker registration.

use std::sync::Arc;

use swcache_client::{FetchConfig, Generation, HttpNetwork, Network, NoCachePaths, Registration, ServiceWorker};
use swcache_core::{AppConfig, CacheDb, Error};
use url::Url;

/// State shared by every tool call.
pub struct AppState {
    pub config: AppConfig,
    pub origin: Url,
    pub registration: Arc<Registration>,
}

impl AppState {
    /// Open cache storage, build the HTTP network and install the worker
    /// for the configured generation.
    pub async fn init(config: AppConfig) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        let network = HttpNetwork::new(FetchConfig::from_app_config(&config)?)?;
        Self::with_parts(config, db, Arc::new(network)).await
    }

    pub async fn with_parts(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let registration = Arc::new(Registration::new(db, network));
        let state = Self { config, origin, registration };
        state.install_current().await?;
        Ok(state)
    }

    /// Register the worker for the configured generation.
    pub async fn install_current(&self) -> Result<Arc<ServiceWorker>, Error> {
        let worker = self
            .registration
            .worker(Generation::from_config(&self.config), NoCachePaths::from_config(&self.config));
        self.registration.register(worker).await
    }
}
