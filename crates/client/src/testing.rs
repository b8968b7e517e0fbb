//! Scripted network for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use swcache_core::{CacheDb, Error};
use url::Url;

use crate::fetch::{FetchMode, Network};
use crate::request::{Request, Response, ResponseSource, ResponseType};

pub(crate) const ORIGIN: &str = "http://gmao.local:3000";

#[derive(Clone)]
struct Route {
    status: StatusCode,
    body: Bytes,
    response_type: ResponseType,
}

/// Answers by URL path; unknown paths get a basic 404.
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, Route>>,
    online: AtomicBool,
    calls: AtomicUsize,
    modes: Mutex<Vec<FetchMode>>,
}

impl MockNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            modes: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn route(&self, path: &str, status: StatusCode, body: &'static str, response_type: ResponseType) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route { status, body: Bytes::from_static(body.as_bytes()), response_type });
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn modes(&self) -> Vec<FetchMode> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request, mode: FetchMode) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push(mode);

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("connection refused".to_string()));
        }

        let route = self.routes.lock().unwrap().get(request.path()).cloned().unwrap_or(Route {
            status: StatusCode::NOT_FOUND,
            body: Bytes::new(),
            response_type: ResponseType::Basic,
        });

        Ok(Response {
            url: request.url.clone(),
            status: route.status,
            headers: HeaderMap::new(),
            body: route.body,
            response_type: route.response_type,
            source: ResponseSource::Network,
        })
    }
}

pub(crate) fn get(path: &str) -> Request {
    Request::get(Url::parse(ORIGIN).unwrap().join(path).unwrap())
}

pub(crate) async fn memory_db() -> CacheDb {
    CacheDb::open_in_memory().await.unwrap()
}
