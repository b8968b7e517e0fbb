//! Network layer used by the worker.
//!
//! ### Fetch modes
//! - `Default`: plain request, page headers passed through.
//! - `NoCache`: adds `Cache-Control: no-cache, no-store, must-revalidate`,
//!   `Pragma: no-cache` and `Expires: 0`, and drops conditional headers so
//!   the origin always sends a full body.
//!
//! ### Response typing
//! - Same origin as the app → `basic`
//! - Cross-origin with `Access-Control-Allow-Origin` → `cors`
//! - Any other cross-origin response → `opaque`
//!
//! Non-2xx statuses are responses, not errors. Only transport failures
//! (DNS, connect, reset, body read) are errors.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, resolve, same_origin};

use crate::request::{Request, Response, ResponseSource, ResponseType};
use swcache_core::{AppConfig, Error};

/// Cache directives attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Default,
    NoCache,
}

/// Issues requests on behalf of the worker.
///
/// Implemented over reqwest by [`HttpNetwork`]; tests substitute their own.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send the request and read the full body.
    async fn fetch(&self, request: &Request, mode: FetchMode) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Application origin, used to type responses.
    pub origin: ::url::Url,

    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Build from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = ::url::Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        })
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, final_url: &::url::Url, headers: &header::HeaderMap) -> ResponseType {
        if same_origin(final_url, &self.config.origin) {
            ResponseType::Basic
        } else if headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
            ResponseType::Cors
        } else {
            ResponseType::Opaque
        }
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

/// Apply no-cache directives to a copy of the page's headers.
pub fn no_cache_headers(headers: &header::HeaderMap) -> header::HeaderMap {
    let mut headers = headers.clone();
    headers.remove(header::IF_NONE_MATCH);
    headers.remove(header::IF_MODIFIED_SINCE);
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache, no-store, must-revalidate"));
    headers.insert(header::PRAGMA, header::HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, header::HeaderValue::from_static("0"));
    headers
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request, mode: FetchMode) -> Result<Response, Error> {
        let start = Instant::now();

        let headers = match mode {
            FetchMode::Default => request.headers.clone(),
            FetchMode::NoCache => no_cache_headers(&request.headers),
        };

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let response_type = self.classify(&final_url, &headers);

        let body = response.bytes().await.map_err(transport_error)?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            response_type = %response_type,
            fetch_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            bytes = body.len(),
            "network fetch complete"
        );

        Ok(Response { url: final_url, status, headers, body, response_type, source: ResponseSource::Network })
    }
}
