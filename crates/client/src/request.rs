//! Request and response model shared by the network layer and the worker.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use swcache_core::cache::hash::compute_request_key;
use swcache_core::{Error, StoredResponse};
use url::Url;

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL with the fragment stripped.
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    /// Create a request; the URL fragment is dropped.
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url, headers: HeaderMap::new(), body: None }
    }

    /// Shorthand for a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// URL path component, query excluded.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Key identifying this request inside a cache store.
    pub fn cache_key(&self) -> String {
        compute_request_key(self.method.as_str(), self.url.as_str())
    }

    /// Only GET requests can be matched against or written to a store.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET
    }
}

/// How a response relates to the worker's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response; the only kind that may be stored.
    Basic,
    /// Cross-origin response the server explicitly shared.
    Cors,
    /// Cross-origin response without sharing headers.
    Opaque,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// Where the worker got a response from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Live network round trip.
    Network,
    /// Served from the current store (cache-first hit).
    Cache,
    /// Network failed on a no-cache path; served from the current store.
    CacheFallback,
}

/// A response returned to the page.
///
/// The body is a reference-counted buffer, so duplicating a response for
/// storage does not consume the copy handed back to the caller.
#[derive(Debug, Clone)]
pub struct Response {
    /// URL the response was served from, after redirects.
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub response_type: ResponseType,
    pub source: ResponseSource,
}

impl Response {
    /// Whether this response may be written to a store.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.response_type == ResponseType::Basic
    }

    /// Content-Type header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Snapshot this response for storage under `request`.
    pub fn to_stored(&self, request: &Request) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        StoredResponse {
            method: request.method.as_str().to_string(),
            url: request.url.to_string(),
            response_url: self.url.to_string(),
            status: self.status.as_u16(),
            response_type: self.response_type.as_str().to_string(),
            headers,
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a store entry.
    pub fn from_stored(stored: StoredResponse, source: ResponseSource) -> Result<Self, Error> {
        let url = Url::parse(&stored.response_url).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let status = StatusCode::from_u16(stored.status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let response_type = stored.response_type.parse()?;

        let mut headers = HeaderMap::with_capacity(stored.headers.len());
        for (name, value) in &stored.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            let value = HeaderValue::from_bytes(value).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, headers, body: Bytes::from(stored.body), response_type, source })
    }
}
