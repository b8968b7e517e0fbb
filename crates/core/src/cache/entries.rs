//! Stored response CRUD within a named store.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response persisted in a cache store.
///
/// Holds the full payload so it can be replayed without touching the
/// network. `url` is the request URL the entry was stored under,
/// `response_url` the URL the response was finally served from. Header
/// values are raw bytes; they need not be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub response_url: String,
    pub status: u16,
    pub response_type: String,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CacheDb {
    /// Look up a stored response in one store.
    ///
    /// Returns None if the store or the entry does not exist. Never creates
    /// the store.
    pub async fn match_entry(&self, store: &str, key_hash: &str) -> Result<Option<StoredResponse>, Error> {
        let store = store.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, response_url, status, response_type, headers_json, body, stored_at
                     FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Vec<u8>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                });

                let (method, url, response_url, status, response_type, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;
                let headers = serde_json::from_str(&headers_json)?;

                Ok(Some(StoredResponse { method, url, response_url, status, response_type, headers, body, stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response, creating the store first if needed.
    ///
    /// An existing entry under the same key is replaced (last write wins).
    pub async fn put_entry(&self, store: &str, key_hash: &str, response: &StoredResponse) -> Result<(), Error> {
        let store = store.to_string();
        let key_hash = key_hash.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![&store, &now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        store, key_hash, method, url, response_url, status,
                        response_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(store, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        response_url = excluded.response_url,
                        status = excluded.status,
                        response_type = excluded.response_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &store,
                        &key_hash,
                        &response.method,
                        &response.url,
                        &response.response_url,
                        response.status as i64,
                        &response.response_type,
                        &headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries held by a store (0 if it does not exist).
    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
