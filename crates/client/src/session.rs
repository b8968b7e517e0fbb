//! Session state for the page side: bearer token, user record, and the
//! cache purge that runs on every login and logout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use swcache_core::Error;

use crate::worker::{ControlMessage, MessageReply, Registration};

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "authToken";

/// Storage key of the serialized user record.
pub const USER_KEY: &str = "authUser";

/// Page-level keys dropped whenever the session changes hands.
pub const APP_CACHE_KEYS: &[&str] = &["actionColumnWidths", "lastViewedActions", "calendarActiveTab"];

/// A string key/value store shared by every handle cloned from it.
#[derive(Debug, Clone, Default)]
pub struct PageStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl PageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).remove(key)
    }

    pub fn clear(&self) {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

/// The authenticated user as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub role: String,
}

impl SessionUser {
    /// Page a user lands on after login.
    pub fn landing_page(&self) -> &'static str {
        match self.role.as_str() {
            "admin" | "manager" => "dashboard.html",
            _ => "actions.html",
        }
    }
}

/// Token and user record persisted in local storage.
pub struct SessionManager {
    local: PageStorage,
    session: PageStorage,
    registration: Arc<Registration>,
    token: Option<String>,
    user: Option<SessionUser>,
}

impl SessionManager {
    /// Restore any session already present in `local`.
    pub fn new(local: PageStorage, session: PageStorage, registration: Arc<Registration>) -> Self {
        let token = local.get(TOKEN_KEY);
        let user = local.get(USER_KEY).and_then(|raw| match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable stored user record");
                None
            }
        });
        Self { local, session, registration, token, user }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// `Authorization` header value for API calls.
    pub fn authorization(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }

    /// Store a fresh session and purge caches left by the previous one.
    ///
    /// Returns the page the user should be sent to.
    pub async fn login(&mut self, token: String, user: SessionUser) -> Result<&'static str, Error> {
        self.local.set(TOKEN_KEY, token.clone());
        self.local.set(USER_KEY, serde_json::to_string(&user)?);
        let landing = user.landing_page();
        self.token = Some(token);
        self.user = Some(user);

        self.clear_app_caches().await;
        Ok(landing)
    }

    /// Forget the session and purge caches.
    pub async fn logout(&mut self) {
        self.token = None;
        self.user = None;
        self.local.remove(TOKEN_KEY);
        self.local.remove(USER_KEY);

        self.clear_app_caches().await;
    }

    /// Drop page-level cache keys and session storage, then ask the worker
    /// to delete every cache store.
    ///
    /// The worker's reply is returned when there was one; failures to reach
    /// it are logged only.
    pub async fn clear_app_caches(&self) -> Option<MessageReply> {
        tracing::info!("clearing application caches");
        for key in APP_CACHE_KEYS {
            self.local.remove(key);
        }
        self.session.clear();

        match self.registration.post_message(ControlMessage::ClearCache).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(error = %e, "could not ask the worker to clear cache stores");
                None
            }
        }
    }
}
